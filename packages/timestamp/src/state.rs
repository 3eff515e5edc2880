//! Storage for the consumer-header index and sealed-epoch metadata.
//!
//! Proofs address values by (substore, key); the store-key constants and
//! key derivations here are the contract between the proof builder, the
//! verifier and the host's store prover. Stored values are canonically
//! JSON-encoded (`cosmwasm_std::to_json_vec`).

use crate::error::TimestampError;
use crate::types::{ChainInfo, Epoch, IndexedHeader};
use btcstamp_quorum::ValidatorWithBlsKey;
use cosmwasm_std::Storage;
use cw_storage_plus::Map;

pub(crate) const CANONICAL_HEADERS: Map<(&str, u64), IndexedHeader> =
    Map::new("canonical_headers");
pub(crate) const FORK_HEADERS: Map<(&str, u64), Vec<IndexedHeader>> = Map::new("fork_headers");
pub(crate) const CHAIN_INFO: Map<&str, ChainInfo> = Map::new("chain_info");
pub(crate) const EPOCH_CHAIN_INFO: Map<(u64, &str), ChainInfo> = Map::new("epoch_chain_info");
pub(crate) const EPOCH_META: Map<u64, Epoch> = Map::new("epoch_meta");
pub(crate) const EPOCH_VALSETS: Map<u64, Vec<ValidatorWithBlsKey>> = Map::new("epoch_valsets");

/// Substore holding canonical consumer headers.
pub const HEADERS_STORE_KEY: &str = "headers";
/// Substore holding sealed-epoch metadata.
pub const EPOCHS_STORE_KEY: &str = "epochs";
/// Substore holding per-epoch validator sets.
pub const VALSETS_STORE_KEY: &str = "valsets";

/// Key of a canonical header within [`HEADERS_STORE_KEY`].
pub fn header_store_key(chain_id: &str, height: u64) -> Vec<u8> {
    let mut key = chain_id.as_bytes().to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// Key of epoch metadata or a validator set within its substore.
pub fn epoch_store_key(epoch: u64) -> Vec<u8> {
    epoch.to_be_bytes().to_vec()
}

pub fn get_header(
    storage: &dyn Storage,
    chain_id: &str,
    height: u64,
) -> Result<IndexedHeader, TimestampError> {
    CANONICAL_HEADERS
        .may_load(storage, (chain_id, height))?
        .ok_or_else(|| TimestampError::HeaderNotFound {
            chain_id: chain_id.to_string(),
            height,
        })
}

pub fn get_chain_info(
    storage: &dyn Storage,
    chain_id: &str,
) -> Result<ChainInfo, TimestampError> {
    CHAIN_INFO
        .may_load(storage, chain_id)?
        .ok_or_else(|| TimestampError::ChainNotFound {
            chain_id: chain_id.to_string(),
        })
}

pub fn get_epoch(storage: &dyn Storage, epoch: u64) -> Result<Epoch, TimestampError> {
    EPOCH_META
        .may_load(storage, epoch)?
        .ok_or(TimestampError::EpochNotFound { epoch })
}

pub fn get_epoch_val_set(
    storage: &dyn Storage,
    epoch: u64,
) -> Result<Vec<ValidatorWithBlsKey>, TimestampError> {
    EPOCH_VALSETS
        .may_load(storage, epoch)?
        .ok_or(TimestampError::ValidatorSetNotFound { epoch })
}

/// Records a sealed epoch's metadata and the validator set that sealed it.
/// Called by the host when the epoch's sealer header is known.
pub fn record_epoch(
    storage: &mut dyn Storage,
    epoch: &Epoch,
    val_set: &[ValidatorWithBlsKey],
) -> Result<(), TimestampError> {
    EPOCH_META.save(storage, epoch.epoch_number, epoch)?;
    EPOCH_VALSETS.save(storage, epoch.epoch_number, &val_set.to_vec())?;
    Ok(())
}

pub fn get_epoch_chain_info(
    storage: &dyn Storage,
    epoch: u64,
    chain_id: &str,
) -> Result<Option<ChainInfo>, TimestampError> {
    Ok(EPOCH_CHAIN_INFO.may_load(storage, (epoch, chain_id))?)
}
