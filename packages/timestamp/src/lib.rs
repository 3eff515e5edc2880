//! BTC timestamp artifacts for consumer-chain headers.
//!
//! Indexes consumer headers and sealed-epoch metadata, assembles the
//! self-describing [`BtcTimestamp`] finality proof for a header once its
//! epoch's checkpoint is finalized on BTC, and verifies such artifacts
//! against nothing but a BTC light client and the deployment's tag.

mod error;
mod indexer;
mod proof;
mod state;
mod types;
mod verify;

pub use self::error::TimestampError;
pub use self::indexer::{
    find_closest_header, get_epoch_headers, handle_header, record_epoch_chain_info,
};
pub use self::proof::{build_btc_timestamp, StoreProver};
pub use self::state::{
    epoch_store_key, get_chain_info, get_epoch, get_epoch_chain_info, get_epoch_val_set,
    get_header, header_store_key, record_epoch, EPOCHS_STORE_KEY, HEADERS_STORE_KEY,
    VALSETS_STORE_KEY,
};
pub use self::types::{BtcTimestamp, ChainInfo, Epoch, IndexedHeader, ProofEpochSealed};
pub use self::verify::verify_btc_timestamp;
