//! Two-part OP_RETURN wire format for epoch checkpoints.
//!
//! A checkpoint is split into two Bitcoin-transaction-sized payloads so that
//! each fits into one OP_RETURN output. The first half carries the epoch
//! number, the last commit hash, the signer bitmap and the submitter address;
//! the second half carries the BLS multisignature plus a 10-byte checksum of
//! the first half's payload, which is what pairs the two halves together.

mod error;

pub use error::WireError;

use sha2::{Digest, Sha256};

pub type Result<T> = std::result::Result<T, WireError>;

/// Network discriminator distinguishing deployments (e.g. mainnet/testnet).
pub const TAG_LEN: usize = 3;

/// The only format version understood by this codec.
pub const CURRENT_VERSION: u8 = 0;

const FIRST_PART_INDEX: u8 = 0;
const SECOND_PART_INDEX: u8 = 1;

/// Each checkpoint is composed of two parts.
pub const NUM_PARTS: u8 = 2;

// tag + 4-bit version + 4-bit part index
pub const HEADER_LEN: usize = TAG_LEN + 1;

pub const LAST_COMMIT_HASH_LEN: usize = 32;

/// Minimal number of bytes able to carry one bit for each of 100 validators
/// (13 * 8 = 104).
pub const BITMAP_LEN: usize = 13;

pub const ADDRESS_LEN: usize = 20;

pub const BLS_SIG_LEN: usize = 48;

/// 64-bit unsigned epoch number, big-endian.
pub const EPOCH_LEN: usize = 8;

// First 10 bytes of sha256 of the first part's payload are appended to the
// second part to ease up pairing of parts.
const CHECKSUM_LEN: usize = 10;

pub const FIRST_PART_LEN: usize =
    HEADER_LEN + EPOCH_LEN + LAST_COMMIT_HASH_LEN + BITMAP_LEN + ADDRESS_LEN;

pub const SECOND_PART_LEN: usize = HEADER_LEN + BLS_SIG_LEN + CHECKSUM_LEN;

/// Length of the connected, application-level checkpoint bytes.
pub const RAW_CHECKPOINT_LEN: usize =
    EPOCH_LEN + LAST_COMMIT_HASH_LEN + BITMAP_LEN + ADDRESS_LEN + BLS_SIG_LEN;

pub type Tag = [u8; TAG_LEN];

/// The checkpoint fields as they travel over the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBtcCheckpoint {
    pub epoch: u64,
    pub last_commit_hash: Vec<u8>,
    pub bitmap: Vec<u8>,
    pub submitter_address: Vec<u8>,
    pub bls_sig: Vec<u8>,
}

/// A decoded checkpoint payload together with the part index it matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointPayload {
    pub data: Vec<u8>,
    pub part: u8,
}

struct FormatHeader {
    tag: Tag,
    version: u8,
    part: u8,
}

fn ver_half(version: u8, part: u8) -> u8 {
    // version in the low nibble, part index in the high nibble
    (version & 0xf) | (part << 4)
}

fn encode_header(tag: Tag, version: u8, part: u8) -> Vec<u8> {
    let mut data = tag.to_vec();
    data.push(ver_half(version, part));
    data
}

fn parse_header(data: &[u8]) -> FormatHeader {
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&data[..TAG_LEN]);
    let ver_half = data[TAG_LEN];
    FormatHeader {
        tag,
        version: ver_half & 0xf,
        part: ver_half >> 4,
    }
}

impl FormatHeader {
    fn validate(&self, expected_tag: Tag, expected_part: u8) -> Result<()> {
        if self.tag != expected_tag {
            return Err(WireError::TagMismatch);
        }
        if self.version > CURRENT_VERSION {
            return Err(WireError::VersionMismatch);
        }
        if self.part != expected_part {
            return Err(WireError::PartMismatch);
        }
        Ok(())
    }
}

fn checksum(first_payload: &[u8]) -> Vec<u8> {
    Sha256::digest(first_payload)[..CHECKSUM_LEN].to_vec()
}

fn check_len(field: &'static str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(WireError::InvalidInputLength {
            field,
            expected,
            got: data.len(),
        });
    }
    Ok(())
}

fn encode_first_half(
    tag: Tag,
    version: u8,
    epoch: u64,
    last_commit_hash: &[u8],
    bitmap: &[u8],
    submitter_address: &[u8],
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(FIRST_PART_LEN);
    bytes.extend_from_slice(&encode_header(tag, version, FIRST_PART_INDEX));
    bytes.extend_from_slice(&epoch.to_be_bytes());
    bytes.extend_from_slice(last_commit_hash);
    bytes.extend_from_slice(bitmap);
    bytes.extend_from_slice(submitter_address);
    bytes
}

fn encode_second_half(tag: Tag, version: u8, first_half: &[u8], bls_sig: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(SECOND_PART_LEN);
    bytes.extend_from_slice(&encode_header(tag, version, SECOND_PART_INDEX));
    bytes.extend_from_slice(bls_sig);
    // the checksum covers only application data, without the header, as the
    // header is always the same
    bytes.extend_from_slice(&checksum(&first_half[HEADER_LEN..]));
    bytes
}

/// Encodes a checkpoint into its two OP_RETURN halves.
pub fn encode_checkpoint(
    tag: Tag,
    version: u8,
    ckpt: &RawBtcCheckpoint,
) -> Result<(Vec<u8>, Vec<u8>)> {
    if version > CURRENT_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    check_len(
        "last_commit_hash",
        &ckpt.last_commit_hash,
        LAST_COMMIT_HASH_LEN,
    )?;
    check_len("bitmap", &ckpt.bitmap, BITMAP_LEN)?;
    check_len("submitter_address", &ckpt.submitter_address, ADDRESS_LEN)?;
    check_len("bls_sig", &ckpt.bls_sig, BLS_SIG_LEN)?;

    let first_half = encode_first_half(
        tag,
        version,
        ckpt.epoch,
        &ckpt.last_commit_hash,
        &ckpt.bitmap,
        &ckpt.submitter_address,
    );
    let second_half = encode_second_half(tag, version, &first_half, &ckpt.bls_sig);

    Ok((first_half, second_half))
}

/// Decodes one checkpoint half, stripping the 4-byte format header.
///
/// Rejects any tag mismatch, any version greater than the supported one,
/// the wrong part number or a wrong-length payload.
pub fn get_checkpoint_data(tag: Tag, version: u8, part: u8, data: &[u8]) -> Result<Vec<u8>> {
    if part >= NUM_PARTS {
        return Err(WireError::InvalidPartIndex(part));
    }
    if version > CURRENT_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let expected_len = if part == FIRST_PART_INDEX {
        FIRST_PART_LEN
    } else {
        SECOND_PART_LEN
    };
    if data.len() != expected_len {
        return Err(WireError::LengthMismatch {
            part,
            expected: expected_len,
            got: data.len(),
        });
    }

    parse_header(data).validate(tag, part)?;

    // at this point this is probable checkpoint data, strip the header and
    // return the payload to the caller
    Ok(data[HEADER_LEN..].to_vec())
}

/// Decodes the second half and verifies its embedded checksum against the
/// externally supplied first-half payload (first half minus its header).
pub fn get_second_checkpoint_data(
    tag: Tag,
    version: u8,
    data: &[u8],
    first_payload: &[u8],
) -> Result<Vec<u8>> {
    let payload = get_checkpoint_data(tag, version, SECOND_PART_INDEX, data)?;
    let embedded = &payload[payload.len() - CHECKSUM_LEN..];
    if checksum(first_payload) != embedded {
        return Err(WireError::ChecksumMismatch);
    }
    Ok(payload)
}

/// Checks whether the given bytes are a potential checkpoint payload; if so,
/// returns the payload along with the part index it decoded as.
pub fn is_checkpoint_payload(tag: Tag, version: u8, data: &[u8]) -> Result<CheckpointPayload> {
    for part in 0..NUM_PARTS {
        if let Ok(payload) = get_checkpoint_data(tag, version, part, data) {
            return Ok(CheckpointPayload {
                data: payload,
                part,
            });
        }
    }
    Err(WireError::PartMismatch)
}

/// Composes the application-level checkpoint bytes by connecting the two
/// decoded payloads and stripping the pairing checksum, i.e.
/// `first_payload || bls_sig`.
pub fn connect_parts(version: u8, first: &[u8], second: &[u8]) -> Result<Vec<u8>> {
    if version > CURRENT_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    check_len("first payload", first, FIRST_PART_LEN - HEADER_LEN)?;
    check_len("second payload", second, SECOND_PART_LEN - HEADER_LEN)?;

    let checksum_start = second.len() - CHECKSUM_LEN;
    if checksum(first) != second[checksum_start..] {
        return Err(WireError::PartsDoNotMatch);
    }

    let mut connected = Vec::with_capacity(RAW_CHECKPOINT_LEN);
    connected.extend_from_slice(first);
    connected.extend_from_slice(&second[..checksum_start]);
    Ok(connected)
}

/// Serializes the checkpoint fields into the connected, application-level
/// payload form, the inverse of [`decode_raw_checkpoint`].
pub fn encode_raw_checkpoint(ckpt: &RawBtcCheckpoint) -> Result<Vec<u8>> {
    check_len(
        "last_commit_hash",
        &ckpt.last_commit_hash,
        LAST_COMMIT_HASH_LEN,
    )?;
    check_len("bitmap", &ckpt.bitmap, BITMAP_LEN)?;
    check_len("submitter_address", &ckpt.submitter_address, ADDRESS_LEN)?;
    check_len("bls_sig", &ckpt.bls_sig, BLS_SIG_LEN)?;

    let mut bytes = Vec::with_capacity(RAW_CHECKPOINT_LEN);
    bytes.extend_from_slice(&ckpt.epoch.to_be_bytes());
    bytes.extend_from_slice(&ckpt.last_commit_hash);
    bytes.extend_from_slice(&ckpt.bitmap);
    bytes.extend_from_slice(&ckpt.submitter_address);
    bytes.extend_from_slice(&ckpt.bls_sig);
    Ok(bytes)
}

/// Extracts the checkpoint fields from the connected payload produced by
/// [`connect_parts`].
pub fn decode_raw_checkpoint(version: u8, bytes: &[u8]) -> Result<RawBtcCheckpoint> {
    if version > CURRENT_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    check_len("raw checkpoint", bytes, RAW_CHECKPOINT_LEN)?;

    let (epoch_bytes, rest) = bytes.split_at(EPOCH_LEN);
    let (last_commit_hash, rest) = rest.split_at(LAST_COMMIT_HASH_LEN);
    let (bitmap, rest) = rest.split_at(BITMAP_LEN);
    let (submitter_address, bls_sig) = rest.split_at(ADDRESS_LEN);

    Ok(RawBtcCheckpoint {
        epoch: u64::from_be_bytes(epoch_bytes.try_into().expect("split yields 8 bytes")),
        last_commit_hash: last_commit_hash.to_vec(),
        bitmap: bitmap.to_vec(),
        submitter_address: submitter_address.to_vec(),
        bls_sig: bls_sig.to_vec(),
    })
}
