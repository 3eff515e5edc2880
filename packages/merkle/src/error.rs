use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a branch over an empty leaf set")]
    EmptyLeafSet,
    #[error("leaf index {index} is out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("hash should have {expected} bytes, got {got}")]
    InvalidHashLength { expected: usize, got: usize },
    #[error("store proof must carry {expected} proof ops, got {got}")]
    InvalidProofOpCount { expected: usize, got: usize },
    #[error("proof op {index} commits to an unexpected key")]
    ProofOpKeyMismatch { index: usize },
    #[error("proof op {index} cannot be decoded: {reason}")]
    ProofOpDecode { index: usize, reason: String },
    #[error("proof op {index} is not an existence proof")]
    NonExistenceProof { index: usize },
    #[error("store proof does not recompute the given root")]
    StoreRootMismatch,
}
