use crate::error::LedgerError;
use btcstamp_bitcoin::Network;
use btcstamp_wire::{Tag, TAG_LEN};
use cosmwasm_schema::cw_serde;
use std::fmt;

/// Lifecycle of a checkpointed epoch on BTC. Strictly monotonic.
#[cw_serde]
#[derive(Copy)]
pub enum BtcStatus {
    Submitted,
    Confirmed,
    Finalized,
}

impl fmt::Display for BtcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

/// Position of one checkpoint half on BTC: confirming block plus the
/// transaction's index within it.
#[cw_serde]
#[derive(Eq)]
pub struct TransactionKey {
    pub index: u32,
    /// Block hash in BTC internal byte order.
    pub hash: Vec<u8>,
}

impl TransactionKey {
    fn append_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.index.to_be_bytes());
    }
}

/// Identity of one full submission: the two transaction positions, first
/// half then second half.
#[cw_serde]
#[derive(Eq)]
pub struct SubmissionKey {
    pub keys: [TransactionKey; 2],
}

const TX_KEY_LEN: usize = 32 + 4;

impl SubmissionKey {
    /// Canonical storage-key encoding, 72 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * TX_KEY_LEN);
        self.keys[0].append_to(&mut out);
        self.keys[1].append_to(&mut out);
        out
    }

    /// Inverse of [`Self::to_bytes`]. The input comes from our own indices,
    /// so a malformed key means the storage itself is corrupted.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() != 2 * TX_KEY_LEN {
            panic!("corrupted submission key in storage index");
        }
        let parse = |chunk: &[u8]| TransactionKey {
            hash: chunk[..32].to_vec(),
            index: u32::from_be_bytes(chunk[32..].try_into().unwrap()),
        };
        Self {
            keys: [parse(&bytes[..TX_KEY_LEN]), parse(&bytes[TX_KEY_LEN..])],
        }
    }
}

/// Everything needed to re-verify one checkpoint half's inclusion on BTC.
#[cw_serde]
pub struct TransactionInfo {
    pub key: TransactionKey,
    /// Consensus-serialized BTC transaction.
    pub transaction: Vec<u8>,
    /// Flat concatenation of the Merkle branch's sibling hashes.
    pub proof: Vec<u8>,
    /// Consensus-serialized confirming BTC header.
    pub header: Vec<u8>,
}

/// Who placed the checkpoint on BTC and who reported it to the ledger.
#[cw_serde]
pub struct CheckpointAddresses {
    /// 20-byte address embedded in the checkpoint's first half.
    pub submitter: Vec<u8>,
    pub reporter: String,
}

#[cw_serde]
pub struct SubmissionData {
    pub epoch: u64,
    pub addresses: CheckpointAddresses,
    pub tx_infos: Vec<TransactionInfo>,
}

/// Per-epoch ledger record. `keys` is append-only in arrival order.
#[cw_serde]
pub struct EpochData {
    pub epoch_number: u64,
    pub keys: Vec<SubmissionKey>,
    pub status: BtcStatus,
    /// Connected application-level checkpoint bytes of the first accepted
    /// submission.
    pub raw_checkpoint: Vec<u8>,
}

/// Depth summary of one submission, derived from the light client at query
/// time. The youngest block is the shallower of the two confirming blocks
/// and defines the submission for best-submission selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionBtcInfo {
    pub key: SubmissionKey,
    pub oldest_block_depth: u64,
    pub youngest_block_depth: u64,
    pub youngest_block_hash: Vec<u8>,
    /// Lowest transaction index within the youngest block.
    pub latest_tx_index: u32,
}

impl SubmissionBtcInfo {
    /// Strict comparison: a shallower youngest block wins, ties go to the
    /// lower transaction index. Equal on both counts is not better, which
    /// leaves insertion order as the final tie-break at the call site.
    ///
    /// Known limitation: a submission split across two blocks can lose to
    /// one confined to a single later block.
    pub fn is_better_than(&self, other: &SubmissionBtcInfo) -> bool {
        if self.youngest_block_depth != other.youngest_block_depth {
            return self.youngest_block_depth < other.youngest_block_depth;
        }
        self.latest_tx_index < other.latest_tx_index
    }
}

/// What to do with a pending submission whose confirming header the light
/// client no longer knows.
#[cw_serde]
#[derive(Copy)]
pub enum StalePolicy {
    /// Keep it pending; it may become known again after a reorg.
    Retain,
    /// Drop the submission from the ledger.
    Prune,
}

#[cw_serde]
pub struct Params {
    pub btc_network: Network,
    /// k: depth at which a submission confirms an epoch.
    pub btc_confirmation_depth: u64,
    /// w: depth at which a confirmed epoch becomes final.
    pub checkpoint_finalization_timeout: u64,
    /// Hex-encoded wire tag of this deployment.
    pub checkpoint_tag: String,
    pub stale_policy: StalePolicy,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            btc_network: Network::Mainnet,
            btc_confirmation_depth: 10,
            checkpoint_finalization_timeout: 100,
            checkpoint_tag: "010203".to_string(),
            stale_policy: StalePolicy::Retain,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.btc_confirmation_depth == 0 {
            return Err(LedgerError::InvalidParams(
                "btc_confirmation_depth must be positive".to_string(),
            ));
        }
        if self.checkpoint_finalization_timeout <= self.btc_confirmation_depth {
            return Err(LedgerError::InvalidParams(
                "checkpoint_finalization_timeout must exceed btc_confirmation_depth".to_string(),
            ));
        }
        self.tag()?;
        Ok(())
    }

    pub fn tag(&self) -> Result<Tag, LedgerError> {
        let bytes = hex::decode(&self.checkpoint_tag)
            .map_err(|e| LedgerError::InvalidParams(format!("checkpoint_tag: {e}")))?;
        bytes.as_slice().try_into().map_err(|_| {
            LedgerError::InvalidParams(format!(
                "checkpoint_tag must decode to {TAG_LEN} bytes, got {}",
                bytes.len()
            ))
        })
    }
}
