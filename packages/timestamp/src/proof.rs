//! BTC timestamp assembly.

use crate::error::TimestampError;
use crate::state::{
    epoch_store_key, get_epoch, get_epoch_chain_info, get_epoch_val_set, get_header,
    header_store_key, EPOCHS_STORE_KEY, HEADERS_STORE_KEY, VALSETS_STORE_KEY,
};
use crate::types::{BtcTimestamp, ProofEpochSealed};
use btcstamp_ledger::{
    get_best_submission, get_epoch_data, get_last_finalized_epoch, get_submission_data,
    BtcLightClient, TransactionInfo,
};
use btcstamp_wire as wire;
use cosmwasm_std::Storage;
use tendermint_proto::crypto::ProofOps;

/// The host store's proof facility: produces an inclusion proof for a key
/// in a substore of the multistore rooted at `root`.
pub trait StoreProver {
    fn prove_inclusion(
        &self,
        root: &[u8],
        store_key: &str,
        key: &[u8],
    ) -> Result<ProofOps, String>;
}

/// First finalized epoch whose chain snapshot covers the header, starting
/// at the header's own commit epoch.
fn resolve_epoch(
    storage: &dyn Storage,
    chain_id: &str,
    height: u64,
    commit_epoch: u64,
) -> Result<u64, TimestampError> {
    let last_finalized = get_last_finalized_epoch(storage)?;
    let mut epoch = commit_epoch;
    while epoch <= last_finalized {
        if let Some(info) = get_epoch_chain_info(storage, epoch, chain_id)? {
            if info
                .latest_header
                .as_ref()
                .map_or(false, |h| h.height >= height)
            {
                return Ok(epoch);
            }
        }
        epoch += 1;
    }
    Err(TimestampError::NotYetFinalized {
        chain_id: chain_id.to_string(),
        height,
    })
}

/// Builds the full finality proof for the consumer header at
/// (`chain_id`, `height`).
pub fn build_btc_timestamp(
    storage: &dyn Storage,
    btc: &dyn BtcLightClient,
    prover: &dyn StoreProver,
    chain_id: &str,
    height: u64,
) -> Result<BtcTimestamp, TimestampError> {
    let header = get_header(storage, chain_id, height)?;
    let epoch_num = resolve_epoch(storage, chain_id, height, header.babylon_epoch)?;

    let epoch_info = get_epoch(storage, epoch_num)?;
    let validator_set = get_epoch_val_set(storage, epoch_num)?;

    let epoch_data = get_epoch_data(storage, epoch_num)?;
    let raw_checkpoint =
        wire::decode_raw_checkpoint(wire::CURRENT_VERSION, &epoch_data.raw_checkpoint)?;

    let best = get_best_submission(storage, btc, epoch_num)?;
    let submission = get_submission_data(storage, &best.key)?
        .unwrap_or_else(|| panic!("finalized submission without submission data"));
    let proof_epoch_submitted: [TransactionInfo; 2] = submission
        .tx_infos
        .try_into()
        .unwrap_or_else(|_| panic!("submission does not hold exactly two transactions"));

    let root = &epoch_info.sealer_app_hash;
    let proof_cz_header_in_epoch = prover
        .prove_inclusion(root, HEADERS_STORE_KEY, &header_store_key(chain_id, height))
        .map_err(TimestampError::Prover)?;
    let proof_epoch_info = prover
        .prove_inclusion(root, EPOCHS_STORE_KEY, &epoch_store_key(epoch_num))
        .map_err(TimestampError::Prover)?;
    let proof_epoch_val_set = prover
        .prove_inclusion(root, VALSETS_STORE_KEY, &epoch_store_key(epoch_num))
        .map_err(TimestampError::Prover)?;

    let btc_headers = proof_epoch_submitted
        .iter()
        .map(|tx_info| tx_info.header.clone())
        .collect();

    Ok(BtcTimestamp {
        header,
        epoch_info,
        raw_checkpoint,
        btc_submission_key: best.key,
        proof_cz_header_in_epoch,
        proof_epoch_sealed: ProofEpochSealed {
            validator_set,
            proof_epoch_info,
            proof_epoch_val_set,
        },
        proof_epoch_submitted,
        btc_headers,
    })
}
