//! The submission state machine.
//!
//! Per epoch, submissions advance `Submitted -> Confirmed -> Finalized` as
//! their confirming BTC blocks gain depth. Transitions only ever move
//! forward. All validation happens before the first write, so a failed
//! insert leaves the ledger untouched.

use crate::error::LedgerError;
use crate::oracle::{BtcLightClient, EpochOracle, HeaderStatus, LedgerEvent};
use crate::spv::{parse_proof, BtcSpvProof, ParsedProof};
use crate::state::{
    get_epoch_data, get_params, has_submission, CONFIRMED_INDEX, EPOCHS, FINALIZED_INDEX,
    LAST_FINALIZED_EPOCH, SUBMISSIONS, UNCONFIRMED_INDEX,
};
use crate::types::{
    BtcStatus, CheckpointAddresses, EpochData, StalePolicy, SubmissionBtcInfo, SubmissionData,
    SubmissionKey, TransactionInfo,
};
use btcstamp_logging::{debug, info};
use btcstamp_wire as wire;
use cosmwasm_std::{Order, StdResult, Storage};

fn tx_info(parsed: &ParsedProof, proof: &BtcSpvProof) -> TransactionInfo {
    TransactionInfo {
        key: parsed.key.clone(),
        transaction: parsed.transaction.clone(),
        proof: proof.merkle_nodes.clone(),
        header: parsed.header.clone(),
    }
}

/// Records one checkpoint submission: two SPV proofs carrying the two
/// OP_RETURN halves, in part order. Returns the epoch the checkpoint is for.
pub fn insert_submission(
    storage: &mut dyn Storage,
    btc: &dyn BtcLightClient,
    oracle: &mut dyn EpochOracle,
    proofs: &[BtcSpvProof; 2],
    reporter: &str,
) -> Result<u64, LedgerError> {
    let params = get_params(storage)?;
    let chain_params = params.btc_network.chain_params();
    let tag = params.tag()?;

    let first = parse_proof(&chain_params, &proofs[0])?;
    let second = parse_proof(&chain_params, &proofs[1])?;

    let first_payload =
        wire::get_checkpoint_data(tag, wire::CURRENT_VERSION, 0, &first.op_return_data)?;
    let second_payload = wire::get_second_checkpoint_data(
        tag,
        wire::CURRENT_VERSION,
        &second.op_return_data,
        &first_payload,
    )?;
    let ckpt_bytes = wire::connect_parts(wire::CURRENT_VERSION, &first_payload, &second_payload)?;

    let key = SubmissionKey {
        keys: [first.key.clone(), second.key.clone()],
    };
    if has_submission(storage, &key) {
        return Err(LedgerError::DuplicatedSubmission);
    }

    // a header on a fork is still acceptable, it just cannot confirm until
    // it becomes canonical; an unknown header is not
    for tk in &key.keys {
        if btc.header_status(&tk.hash) == HeaderStatus::Unknown {
            return Err(LedgerError::UnknownHeader);
        }
    }

    let ckpt = wire::decode_raw_checkpoint(wire::CURRENT_VERSION, &ckpt_bytes)?;
    oracle
        .verify_checkpoint(&ckpt)
        .map_err(LedgerError::InvalidCheckpointProof)?;

    let epoch = ckpt.epoch;
    let existing = EPOCHS.may_load(storage, epoch)?;
    if let Some(data) = &existing {
        if data.status == BtcStatus::Finalized {
            return Err(LedgerError::EpochAlreadyFinalized { epoch });
        }
    }

    // validations done, mutate
    let key_bytes = key.to_bytes();
    let is_first = existing.is_none();
    let mut epoch_data = existing.unwrap_or(EpochData {
        epoch_number: epoch,
        keys: vec![],
        status: BtcStatus::Submitted,
        raw_checkpoint: ckpt_bytes,
    });
    epoch_data.keys.push(key.clone());
    EPOCHS.save(storage, epoch, &epoch_data)?;

    SUBMISSIONS.save(
        storage,
        &key_bytes,
        &SubmissionData {
            epoch,
            addresses: CheckpointAddresses {
                submitter: ckpt.submitter_address,
                reporter: reporter.to_string(),
            },
            tx_infos: vec![tx_info(&first, &proofs[0]), tx_info(&second, &proofs[1])],
        },
    )?;
    UNCONFIRMED_INDEX.save(storage, &key_bytes, &epoch)?;

    if is_first {
        oracle.on_event(LedgerEvent::SubmissionAccepted {
            epoch,
            key: key.clone(),
        });
    }
    info!("accepted checkpoint submission for epoch {epoch}");

    Ok(epoch)
}

enum ChainView {
    /// Both confirming blocks are on the main chain; `shallowest` is the
    /// smaller of the two depths, i.e. the binding one.
    OnMain { shallowest: u64 },
    Fork,
    Unknown,
}

fn submission_chain_view(btc: &dyn BtcLightClient, key: &SubmissionKey) -> ChainView {
    let mut shallowest = u64::MAX;
    for tk in &key.keys {
        match btc.header_status(&tk.hash) {
            HeaderStatus::OnMainChain { depth } => shallowest = shallowest.min(depth),
            HeaderStatus::OnFork => return ChainView::Fork,
            HeaderStatus::Unknown => return ChainView::Unknown,
        }
    }
    ChainView::OnMain { shallowest }
}

fn index_entries(
    storage: &dyn Storage,
    index: &cw_storage_plus::Map<&[u8], u64>,
) -> Result<Vec<(Vec<u8>, u64)>, LedgerError> {
    Ok(index
        .range(storage, None, None, Order::Ascending)
        .collect::<StdResult<Vec<_>>>()?)
}

/// Re-evaluates every pending submission against the light client's current
/// main chain. Idempotent: with no intervening tip change, a second call
/// changes nothing.
pub fn on_tip_change(
    storage: &mut dyn Storage,
    btc: &dyn BtcLightClient,
    oracle: &mut dyn EpochOracle,
) -> Result<(), LedgerError> {
    let params = get_params(storage)?;

    // pass 1: unconfirmed submissions that became k-deep
    for (key_bytes, epoch) in index_entries(storage, &UNCONFIRMED_INDEX)? {
        let key = SubmissionKey::from_bytes(&key_bytes);
        match submission_chain_view(btc, &key) {
            ChainView::OnMain { shallowest } if shallowest >= params.btc_confirmation_depth => {
                UNCONFIRMED_INDEX.remove(storage, &key_bytes);
                CONFIRMED_INDEX.save(storage, &key_bytes, &epoch)?;
                let mut epoch_data = get_epoch_data(storage, epoch)?;
                if epoch_data.status == BtcStatus::Submitted {
                    epoch_data.status = BtcStatus::Confirmed;
                    EPOCHS.save(storage, epoch, &epoch_data)?;
                    oracle.on_event(LedgerEvent::EpochConfirmed { epoch });
                    info!("epoch {epoch} confirmed on BTC");
                }
            }
            ChainView::OnMain { .. } | ChainView::Fork => {}
            ChainView::Unknown => {
                if params.stale_policy == StalePolicy::Prune {
                    UNCONFIRMED_INDEX.remove(storage, &key_bytes);
                    SUBMISSIONS.remove(storage, &key_bytes);
                    debug!("pruned stale submission for epoch {epoch}");
                }
            }
        }
    }

    // pass 2: confirmed submissions that became w-deep
    for (key_bytes, epoch) in index_entries(storage, &CONFIRMED_INDEX)? {
        let key = SubmissionKey::from_bytes(&key_bytes);
        match submission_chain_view(btc, &key) {
            ChainView::OnMain { shallowest }
                if shallowest >= params.checkpoint_finalization_timeout =>
            {
                CONFIRMED_INDEX.remove(storage, &key_bytes);
                FINALIZED_INDEX.save(storage, &key_bytes, &epoch)?;
                let mut epoch_data = get_epoch_data(storage, epoch)?;
                if epoch_data.status == BtcStatus::Confirmed {
                    epoch_data.status = BtcStatus::Finalized;
                    EPOCHS.save(storage, epoch, &epoch_data)?;
                    let last = LAST_FINALIZED_EPOCH.may_load(storage)?.unwrap_or(0);
                    if epoch > last {
                        LAST_FINALIZED_EPOCH.save(storage, &epoch)?;
                    }
                    oracle.on_event(LedgerEvent::EpochFinalized { epoch });
                    info!("epoch {epoch} finalized on BTC");
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Depth summary of one submission at the light client's current tip.
pub fn submission_btc_info(
    btc: &dyn BtcLightClient,
    key: &SubmissionKey,
) -> Result<SubmissionBtcInfo, LedgerError> {
    let mut youngest_block_depth = u64::MAX;
    let mut youngest_block_hash = Vec::new();
    let mut latest_tx_index = u32::MAX;
    let mut oldest_block_depth = 0;

    for tk in &key.keys {
        let depth = match btc.header_status(&tk.hash) {
            HeaderStatus::OnMainChain { depth } => depth,
            _ => return Err(LedgerError::UnknownHeader),
        };
        if depth < youngest_block_depth {
            youngest_block_depth = depth;
            youngest_block_hash = tk.hash.clone();
            latest_tx_index = tk.index;
        } else if depth == youngest_block_depth && tk.index < latest_tx_index {
            latest_tx_index = tk.index;
        }
        oldest_block_depth = oldest_block_depth.max(depth);
    }

    Ok(SubmissionBtcInfo {
        key: key.clone(),
        oldest_block_depth,
        youngest_block_depth,
        youngest_block_hash,
        latest_tx_index,
    })
}

/// Picks the best finalized submission of an epoch: the one whose youngest
/// block is shallowest, ties broken by the lower transaction index, then by
/// insertion order.
pub fn get_best_submission(
    storage: &dyn Storage,
    btc: &dyn BtcLightClient,
    epoch: u64,
) -> Result<SubmissionBtcInfo, LedgerError> {
    let epoch_data = get_epoch_data(storage, epoch)?;

    let mut best: Option<SubmissionBtcInfo> = None;
    for key in &epoch_data.keys {
        if !FINALIZED_INDEX.has(storage, &key.to_bytes()) {
            continue;
        }
        let info = submission_btc_info(btc, key)?;
        if best.as_ref().map_or(true, |b| info.is_better_than(b)) {
            best = Some(info);
        }
    }
    best.ok_or(LedgerError::NoFinalizedSubmission { epoch })
}
