//! Collaborator seams of the submission ledger.

use crate::types::SubmissionKey;
use btcstamp_wire::RawBtcCheckpoint;

/// What the BTC light client currently knows about a block hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderStatus {
    /// On the currently selected main chain, `depth` blocks from the tip
    /// (the tip itself has depth 0).
    OnMainChain { depth: u64 },
    /// Known, but on a fork.
    OnFork,
    Unknown,
}

/// Read-only view of the host's BTC light client.
pub trait BtcLightClient {
    fn header_status(&self, hash: &[u8]) -> HeaderStatus;
}

/// Status transitions the ledger reports to its host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// First accepted submission for an epoch; the epoch is now `Submitted`.
    SubmissionAccepted { epoch: u64, key: SubmissionKey },
    EpochConfirmed { epoch: u64 },
    EpochFinalized { epoch: u64 },
}

/// The checkpointing side of the protocol: validates candidate checkpoints
/// against epoch metadata it owns, and consumes the ledger's events.
pub trait EpochOracle {
    /// Signature/epoch consistency checks on a candidate raw checkpoint.
    fn verify_checkpoint(&self, ckpt: &RawBtcCheckpoint) -> Result<(), String>;

    fn on_event(&mut self, event: LedgerEvent);
}
