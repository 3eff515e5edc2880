use btcstamp_ledger::{SubmissionKey, TransactionInfo};
use btcstamp_quorum::ValidatorWithBlsKey;
use btcstamp_wire::RawBtcCheckpoint;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{to_json_vec, StdResult};
use serde::Serialize;
use tendermint_proto::crypto::ProofOps;

/// A consumer-chain header as indexed by the timestamping chain.
#[cw_serde]
pub struct IndexedHeader {
    pub chain_id: String,
    pub height: u64,
    pub hash: Vec<u8>,
    /// Epoch in which this header was committed to the timestamping chain.
    pub babylon_epoch: u64,
    /// Commit hash of the timestamping-chain block that carried the header.
    pub babylon_header_commit_hash: Vec<u8>,
    /// Hash of the transaction that carried the header.
    pub babylon_tx_hash: Vec<u8>,
}

/// Live view of one consumer chain, mutated on every accepted header.
#[cw_serde]
pub struct ChainInfo {
    pub chain_id: String,
    pub latest_header: Option<IndexedHeader>,
    /// Competing headers at the latest fork height, if any.
    pub latest_forks: Vec<IndexedHeader>,
    pub timestamped_headers_count: u64,
}

/// Metadata of a sealed epoch. The sealer header is the first header of the
/// next epoch; its application hash commits to this epoch's metadata and
/// validator set.
#[cw_serde]
pub struct Epoch {
    pub epoch_number: u64,
    pub sealer_block_hash: Vec<u8>,
    pub sealer_app_hash: Vec<u8>,
    pub sealer_block_height: u64,
}

impl Epoch {
    /// The byte representation committed in the epochs substore. The sealer
    /// application hash only exists once the committed state is hashed, so it
    /// cannot be part of the committed value itself.
    pub fn committed_bytes(&self) -> StdResult<Vec<u8>> {
        #[derive(Serialize)]
        struct Committed<'a> {
            epoch_number: u64,
            sealer_block_hash: &'a [u8],
            sealer_block_height: u64,
        }
        to_json_vec(&Committed {
            epoch_number: self.epoch_number,
            sealer_block_hash: &self.sealer_block_hash,
            sealer_block_height: self.sealer_block_height,
        })
    }
}

/// Proof that an epoch was sealed by a quorum of its validator set: the set
/// itself plus store-inclusion proofs of the epoch metadata and the set,
/// both rooted at the sealer header's application hash.
#[derive(Clone, Debug, PartialEq)]
pub struct ProofEpochSealed {
    pub validator_set: Vec<ValidatorWithBlsKey>,
    pub proof_epoch_info: ProofOps,
    pub proof_epoch_val_set: ProofOps,
}

/// The self-describing finality proof for one consumer header. A verifier
/// needs nothing beyond this artifact and its own BTC light client.
#[derive(Clone, Debug, PartialEq)]
pub struct BtcTimestamp {
    pub header: IndexedHeader,
    pub epoch_info: Epoch,
    pub raw_checkpoint: RawBtcCheckpoint,
    pub btc_submission_key: SubmissionKey,
    /// Inclusion of the header in the canonical-chain store at the sealer
    /// application hash.
    pub proof_cz_header_in_epoch: ProofOps,
    pub proof_epoch_sealed: ProofEpochSealed,
    /// SPV evidence for the epoch's best finalized submission, part order.
    pub proof_epoch_submitted: [TransactionInfo; 2],
    /// Consensus-serialized confirming BTC headers, so a verifier whose
    /// light client lags can catch up first. Not consumed by verification.
    pub btc_headers: Vec<Vec<u8>>,
}
