use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuorumError {
    #[error("bitmap selects validator {index} but the set only has {len}")]
    UnknownValidatorIndex { index: usize, len: usize },
    #[error("validator {index} carries a malformed BLS public key")]
    InvalidPublicKey { index: usize },
    #[error("signers hold {signed} of {total} voting power, short of the 2/3 quorum")]
    InsufficientVotingPower { signed: u128, total: u128 },
    #[error("BLS multisignature does not verify against the selected key set")]
    InvalidSignature,
}
