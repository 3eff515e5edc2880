//! Checkpoint submission ledger.
//!
//! Tracks, per epoch, every BTC submission of a checkpoint and advances the
//! epoch through `Submitted -> Confirmed -> Finalized` as the submitting
//! blocks gain depth. Storage is injected (`cosmwasm_std::Storage`), the
//! BTC light client and the checkpointing side are collaborator traits.

mod error;
mod ledger;
mod oracle;
mod spv;
mod state;
mod types;

pub use self::error::LedgerError;
pub use self::ledger::{
    get_best_submission, insert_submission, on_tip_change, submission_btc_info,
};
pub use self::oracle::{BtcLightClient, EpochOracle, HeaderStatus, LedgerEvent};
pub use self::spv::{parse_proof, BtcSpvProof, ParsedProof};
pub use self::state::{
    get_epoch_data, get_epoch_status, get_last_finalized_epoch, get_params, get_submission_data,
    has_submission, init,
};
pub use self::types::{
    BtcStatus, CheckpointAddresses, EpochData, Params, StalePolicy, SubmissionBtcInfo,
    SubmissionData, SubmissionKey, TransactionInfo, TransactionKey,
};
