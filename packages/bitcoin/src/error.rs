use bitcoin::block::ValidationError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Header's target is larger than pow_limit")]
    TargetTooLarge,
    #[error("proof-of-work validation failed: {0:?}")]
    InvalidProofOfWork(ValidationError),
    #[error("no OP_RETURN output in this BTC tx")]
    NoOpReturn,
}
