//! Checkpoint quorum certificates.
//!
//! A raw checkpoint is valid when the validators selected by its bitmap hold
//! strictly more than 2/3 of the epoch's voting power and their aggregated
//! BLS signature verifies over `epoch_num (8-byte BE) || last_commit_hash`.

mod bls;
mod error;

pub use self::bls::{BlsVerifier, BlstVerifier, BLS_DST};
pub use self::error::QuorumError;

use bitvec::order::Lsb0;
use bitvec::view::BitView;
use btcstamp_wire::RawBtcCheckpoint;

/// A checkpoint as assembled by the checkpointing chain, before BTC encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCheckpoint {
    pub epoch_num: u64,
    pub last_commit_hash: Vec<u8>,
    pub bitmap: Vec<u8>,
    pub bls_multi_sig: Vec<u8>,
}

impl From<RawBtcCheckpoint> for RawCheckpoint {
    fn from(ckpt: RawBtcCheckpoint) -> Self {
        Self {
            epoch_num: ckpt.epoch,
            last_commit_hash: ckpt.last_commit_hash,
            bitmap: ckpt.bitmap,
            bls_multi_sig: ckpt.bls_sig,
        }
    }
}

/// One member of an epoch's validator set.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidatorWithBlsKey {
    pub addr: String,
    pub bls_pub_key: Vec<u8>,
    pub voting_power: u64,
}

/// The message the validators co-sign for a checkpoint.
pub fn signed_msg(epoch_num: u64, last_commit_hash: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(8 + last_commit_hash.len());
    msg.extend_from_slice(&epoch_num.to_be_bytes());
    msg.extend_from_slice(last_commit_hash);
    msg
}

/// Checks the checkpoint's quorum certificate against the epoch's validator
/// set. Bitmap bits are read least-significant-bit first within each byte;
/// bit `i` selects `validators[i]`.
pub fn verify_quorum(
    ckpt: &RawCheckpoint,
    validators: &[ValidatorWithBlsKey],
    verifier: &impl BlsVerifier,
) -> Result<(), QuorumError> {
    let bits = ckpt.bitmap.view_bits::<Lsb0>();

    // the validator set is attacker-supplied until its store proof checks
    // out, so power sums must not overflow
    let mut signer_keys: Vec<&[u8]> = Vec::new();
    let mut signed_power: u128 = 0;
    for index in bits.iter_ones() {
        let val = validators
            .get(index)
            .ok_or(QuorumError::UnknownValidatorIndex {
                index,
                len: validators.len(),
            })?;
        signer_keys.push(&val.bls_pub_key);
        signed_power += u128::from(val.voting_power);
    }

    let total_power: u128 = validators.iter().map(|v| u128::from(v.voting_power)).sum();
    // strict 2/3 majority
    if signed_power * 3 <= total_power * 2 {
        return Err(QuorumError::InsufficientVotingPower {
            signed: signed_power,
            total: total_power,
        });
    }

    let msg = signed_msg(ckpt.epoch_num, &ckpt.last_commit_hash);
    verifier.verify_multisig(&ckpt.bls_multi_sig, &signer_keys, &msg)
}
