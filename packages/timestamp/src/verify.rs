//! Stand-alone verification of a [`BtcTimestamp`].
//!
//! A verifier holds nothing but the artifact, the deployment's checkpoint
//! tag and a view of the BTC main chain; everything else the artifact
//! carries and proves about itself.

use crate::error::TimestampError;
use crate::state::{
    epoch_store_key, header_store_key, EPOCHS_STORE_KEY, HEADERS_STORE_KEY, VALSETS_STORE_KEY,
};
use crate::types::BtcTimestamp;
use btcstamp_bitcoin::{
    deserialize, extract_op_return_data, verify_header_pow, BlockHeader, Hash, Network,
    Transaction,
};
use btcstamp_ledger::{BtcLightClient, HeaderStatus, TransactionInfo};
use btcstamp_merkle::{verify_branch, CommitmentVerifier};
use btcstamp_quorum::{verify_quorum, BlsVerifier, RawCheckpoint};
use btcstamp_wire as wire;
use btcstamp_wire::Tag;
use cosmwasm_std::to_json_vec;

/// Checks one transaction's SPV evidence and returns its OP_RETURN payload.
fn checked_op_return(
    network: Network,
    index: usize,
    tx_info: &TransactionInfo,
) -> Result<Vec<u8>, TimestampError> {
    let header: BlockHeader = deserialize(&tx_info.header)
        .map_err(|e| TimestampError::BtcDecode(format!("header {index}: {e}")))?;
    verify_header_pow(&network.chain_params(), &header)?;

    if tx_info.key.hash != header.block_hash().to_byte_array() {
        return Err(TimestampError::TxKeyMismatch { index });
    }

    let tx: Transaction = deserialize(&tx_info.transaction)
        .map_err(|e| TimestampError::BtcDecode(format!("transaction {index}: {e}")))?;
    if !verify_branch(
        &tx.compute_txid().to_byte_array(),
        &header.merkle_root.to_byte_array(),
        &tx_info.proof,
        tx_info.key.index,
    ) {
        return Err(TimestampError::TxNotInHeader { index });
    }

    Ok(extract_op_return_data(&tx)?)
}

/// Verifies the full finality proof:
///
/// 1. the checkpoint carries a valid quorum certificate of the enclosed
///    validator set,
/// 2. the checkpoint seals the epoch whose metadata the artifact carries,
/// 3. the epoch metadata, the validator set and the consumer header are all
///    committed under the sealer header's application hash,
/// 4. the very same checkpoint sits in two OP_RETURN outputs whose
///    transactions are included in the artifact's BTC headers,
/// 5. at least one of those headers is `finalization_depth` deep on the
///    verifier's BTC main chain.
pub fn verify_btc_timestamp(
    ts: &BtcTimestamp,
    tag: Tag,
    network: Network,
    finalization_depth: u64,
    btc: &dyn BtcLightClient,
    bls: &impl BlsVerifier,
    store: &impl CommitmentVerifier,
) -> Result<(), TimestampError> {
    let epoch = &ts.epoch_info;
    let val_set = &ts.proof_epoch_sealed.validator_set;
    let ckpt: RawCheckpoint = ts.raw_checkpoint.clone().into();

    // 1. quorum certificate
    verify_quorum(&ckpt, val_set, bls)?;

    // 2. the checkpoint seals this epoch
    if ts.raw_checkpoint.epoch != epoch.epoch_number {
        return Err(TimestampError::CheckpointMismatch);
    }
    if ts.raw_checkpoint.last_commit_hash != epoch.sealer_block_hash {
        return Err(TimestampError::SealedHashMismatch);
    }

    // 3. epoch metadata, validator set and header under the sealer app hash
    let root = &epoch.sealer_app_hash;
    store.verify_inclusion(
        root,
        EPOCHS_STORE_KEY,
        &epoch_store_key(epoch.epoch_number),
        &epoch.committed_bytes()?,
        &ts.proof_epoch_sealed.proof_epoch_info,
    )?;
    store.verify_inclusion(
        root,
        VALSETS_STORE_KEY,
        &epoch_store_key(epoch.epoch_number),
        &to_json_vec(val_set)?,
        &ts.proof_epoch_sealed.proof_epoch_val_set,
    )?;

    if ts.header.babylon_epoch != epoch.epoch_number {
        return Err(TimestampError::EpochNumberMismatch {
            header_epoch: ts.header.babylon_epoch,
            epoch: epoch.epoch_number,
        });
    }
    store.verify_inclusion(
        root,
        HEADERS_STORE_KEY,
        &header_store_key(&ts.header.chain_id, ts.header.height),
        &to_json_vec(&ts.header)?,
        &ts.proof_cz_header_in_epoch,
    )?;

    // 4. the checkpoint is the one anchored on BTC
    let mut payloads = Vec::with_capacity(2);
    for (index, tx_info) in ts.proof_epoch_submitted.iter().enumerate() {
        if ts.btc_submission_key.keys[index] != tx_info.key {
            return Err(TimestampError::TxKeyMismatch { index });
        }
        payloads.push(checked_op_return(network, index, tx_info)?);
    }
    let first_payload = wire::get_checkpoint_data(tag, wire::CURRENT_VERSION, 0, &payloads[0])?;
    let second_payload = wire::get_second_checkpoint_data(
        tag,
        wire::CURRENT_VERSION,
        &payloads[1],
        &first_payload,
    )?;
    let connected = wire::connect_parts(wire::CURRENT_VERSION, &first_payload, &second_payload)?;
    // the submitter address is not signed over and the anchored submission
    // may come from a different submitter, so compare the signed fields only
    let anchored: RawCheckpoint =
        wire::decode_raw_checkpoint(wire::CURRENT_VERSION, &connected)?.into();
    if anchored != ckpt {
        return Err(TimestampError::CheckpointMismatch);
    }

    // 5. depth on the verifier's main chain
    let deep_enough = ts.proof_epoch_submitted.iter().any(|tx_info| {
        matches!(
            btc.header_status(&tx_info.key.hash),
            HeaderStatus::OnMainChain { depth } if depth >= finalization_depth
        )
    });
    if !deep_enough {
        return Err(TimestampError::InsufficientDepth);
    }

    Ok(())
}
