//! Storage layout of the submission ledger.
//!
//! All access goes through an injected `cosmwasm_std::Storage`, which keeps
//! the state machine store-agnostic and testable against `MockStorage`.
//! Submission-keyed maps use [`SubmissionKey::to_bytes`] as the raw key.

use crate::error::LedgerError;
use crate::types::{BtcStatus, EpochData, Params, SubmissionData, SubmissionKey};
use cosmwasm_std::Storage;
use cw_storage_plus::{Item, Map};

pub(crate) const PARAMS: Item<Params> = Item::new("params");
pub(crate) const EPOCHS: Map<u64, EpochData> = Map::new("epochs");
pub(crate) const SUBMISSIONS: Map<&[u8], SubmissionData> = Map::new("submissions");

// Pending/confirmed/finalized submission indices; value is the epoch the
// submission checkpoints. A key lives in exactly one of the three.
pub(crate) const UNCONFIRMED_INDEX: Map<&[u8], u64> = Map::new("unconfirmed_index");
pub(crate) const CONFIRMED_INDEX: Map<&[u8], u64> = Map::new("confirmed_index");
pub(crate) const FINALIZED_INDEX: Map<&[u8], u64> = Map::new("finalized_index");

pub(crate) const LAST_FINALIZED_EPOCH: Item<u64> = Item::new("last_finalized_epoch");

/// Validates and persists the ledger parameters.
pub fn init(storage: &mut dyn Storage, params: &Params) -> Result<(), LedgerError> {
    params.validate()?;
    PARAMS.save(storage, params)?;
    Ok(())
}

pub fn get_params(storage: &dyn Storage) -> Result<Params, LedgerError> {
    Ok(PARAMS.load(storage)?)
}

pub fn get_epoch_data(storage: &dyn Storage, epoch: u64) -> Result<EpochData, LedgerError> {
    EPOCHS
        .may_load(storage, epoch)?
        .ok_or(LedgerError::EpochNotFound { epoch })
}

pub fn get_epoch_status(storage: &dyn Storage, epoch: u64) -> Result<BtcStatus, LedgerError> {
    Ok(get_epoch_data(storage, epoch)?.status)
}

pub fn get_submission_data(
    storage: &dyn Storage,
    key: &SubmissionKey,
) -> Result<Option<SubmissionData>, LedgerError> {
    Ok(SUBMISSIONS.may_load(storage, &key.to_bytes())?)
}

pub fn has_submission(storage: &dyn Storage, key: &SubmissionKey) -> bool {
    SUBMISSIONS.has(storage, &key.to_bytes())
}

/// Zero means no epoch has been finalized yet.
pub fn get_last_finalized_epoch(storage: &dyn Storage) -> Result<u64, LedgerError> {
    Ok(LAST_FINALIZED_EPOCH.may_load(storage)?.unwrap_or(0))
}
