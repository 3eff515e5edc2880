use btcstamp_bitcoin::error::Error as BitcoinError;
use btcstamp_ledger::LedgerError;
use btcstamp_merkle::MerkleError;
use btcstamp_quorum::QuorumError;
use btcstamp_wire::WireError;
use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimestampError {
    #[error("{0}")]
    Std(#[from] StdError),
    #[error("checkpoint payload: {0}")]
    Wire(#[from] WireError),
    #[error("store proof: {0}")]
    Merkle(#[from] MerkleError),
    #[error("quorum certificate: {0}")]
    Quorum(#[from] QuorumError),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("confirming BTC header: {0}")]
    Bitcoin(#[from] BitcoinError),
    #[error("no chain with id {chain_id}")]
    ChainNotFound { chain_id: String },
    #[error("chain {chain_id} has no canonical header at height {height}")]
    HeaderNotFound { chain_id: String, height: u64 },
    #[error("no metadata for epoch {epoch}")]
    EpochNotFound { epoch: u64 },
    #[error("no validator set recorded for epoch {epoch}")]
    ValidatorSetNotFound { epoch: u64 },
    #[error("no finalized epoch covers chain {chain_id} at height {height}")]
    NotYetFinalized { chain_id: String, height: u64 },
    #[error("store prover: {0}")]
    Prover(String),
    #[error("checkpoint does not seal the epoch's recorded block hash")]
    SealedHashMismatch,
    #[error("header claims epoch {header_epoch} but the proof is for epoch {epoch}")]
    EpochNumberMismatch { header_epoch: u64, epoch: u64 },
    #[error("BTC-anchored checkpoint differs from the signed checkpoint")]
    CheckpointMismatch,
    #[error("cannot decode embedded BTC data: {0}")]
    BtcDecode(String),
    #[error("transaction {index} is not included in its claimed BTC header")]
    TxNotInHeader { index: usize },
    #[error("transaction {index} key does not match its claimed BTC header")]
    TxKeyMismatch { index: usize },
    #[error("neither confirming BTC header is deep enough on the main chain")]
    InsufficientDepth,
}
