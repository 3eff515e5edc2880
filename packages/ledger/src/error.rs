use btcstamp_wire::WireError;
use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    Std(#[from] StdError),
    #[error("checkpoint payload: {0}")]
    Wire(#[from] WireError),
    #[error("{0}")]
    Bitcoin(#[from] btcstamp_bitcoin::error::Error),
    #[error("cannot decode BTC header: {0}")]
    HeaderDecode(String),
    #[error("cannot decode BTC transaction: {0}")]
    TxDecode(String),
    #[error("transaction is not included in the confirming header")]
    InvalidMerkleProof,
    #[error("this submission is already on record")]
    DuplicatedSubmission,
    #[error("confirming BTC header is unknown to the light client")]
    UnknownHeader,
    #[error("checkpoint rejected by the epoch oracle: {0}")]
    InvalidCheckpointProof(String),
    #[error("epoch {epoch} is already finalized")]
    EpochAlreadyFinalized { epoch: u64 },
    #[error("no data for epoch {epoch}")]
    EpochNotFound { epoch: u64 },
    #[error("epoch {epoch} has no finalized submission")]
    NoFinalizedSubmission { epoch: u64 },
    #[error("invalid params: {0}")]
    InvalidParams(String),
}
