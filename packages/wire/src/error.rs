use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WireError {
    #[error("{field} should have {expected} bytes, got {got}")]
    InvalidInputLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("format version {0} is not supported")]
    UnsupportedVersion(u8),
    #[error("part index {0} is not valid, a checkpoint has two parts")]
    InvalidPartIndex(u8),
    #[error("part {part} should have {expected} bytes, got {got}")]
    LengthMismatch {
        part: u8,
        expected: usize,
        got: usize,
    },
    #[error("payload does not carry the expected tag")]
    TagMismatch,
    #[error("payload header carries an unsupported version")]
    VersionMismatch,
    #[error("payload header carries the wrong part number")]
    PartMismatch,
    #[error("second-half checksum does not match the first half")]
    ChecksumMismatch,
    #[error("checkpoint parts do not connect")]
    PartsDoNotMatch,
}
