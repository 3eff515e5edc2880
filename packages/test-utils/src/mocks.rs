//! Mock collaborators for the ledger's seams.

use btcstamp_ledger::{BtcLightClient, EpochOracle, HeaderStatus, LedgerEvent};
use btcstamp_wire::RawBtcCheckpoint;
use std::collections::{HashMap, HashSet};

/// In-memory BTC light client: a map of main-chain headers by height plus a
/// set of fork headers. Depth of a main-chain header is `tip - height`.
#[derive(Default)]
pub struct MockLightClient {
    main: HashMap<Vec<u8>, u64>,
    forks: HashSet<Vec<u8>>,
    tip_height: u64,
}

impl MockLightClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_main(&mut self, hash: &[u8], height: u64) {
        self.main.insert(hash.to_vec(), height);
        self.tip_height = self.tip_height.max(height);
    }

    pub fn insert_fork(&mut self, hash: &[u8]) {
        self.forks.insert(hash.to_vec());
    }

    /// Simulates `n` new blocks on top of the current tip.
    pub fn advance_tip(&mut self, n: u64) {
        self.tip_height += n;
    }

    pub fn forget(&mut self, hash: &[u8]) {
        self.main.remove(hash);
        self.forks.remove(hash);
    }
}

impl BtcLightClient for MockLightClient {
    fn header_status(&self, hash: &[u8]) -> HeaderStatus {
        if let Some(height) = self.main.get(hash) {
            return HeaderStatus::OnMainChain {
                depth: self.tip_height - height,
            };
        }
        if self.forks.contains(hash) {
            return HeaderStatus::OnFork;
        }
        HeaderStatus::Unknown
    }
}

/// Epoch oracle that records every event and optionally rejects checkpoints.
#[derive(Default)]
pub struct RecordingOracle {
    pub events: Vec<LedgerEvent>,
    pub reject_with: Option<String>,
}

impl RecordingOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            events: Vec::new(),
            reject_with: Some(reason.to_string()),
        }
    }
}

impl EpochOracle for RecordingOracle {
    fn verify_checkpoint(&self, _ckpt: &RawBtcCheckpoint) -> Result<(), String> {
        match &self.reject_with {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn on_event(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}
