//! BLS12-381 multisignature verification.
//!
//! Checkpoints carry 48-byte signatures, so points live on G1 and public
//! keys on G2 (the minimal-signature-size variant). All signers sign the
//! same message, which lets us use fast aggregate verification.

use crate::error::QuorumError;
use blst::min_sig::{PublicKey, Signature};
use blst::BLST_ERROR;

/// Domain separation tag of the basic scheme over G1.
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

/// Verifies an aggregated BLS signature over a single message.
pub trait BlsVerifier {
    fn verify_multisig(
        &self,
        sig: &[u8],
        pub_keys: &[&[u8]],
        msg: &[u8],
    ) -> Result<(), QuorumError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BlstVerifier;

impl BlsVerifier for BlstVerifier {
    fn verify_multisig(
        &self,
        sig: &[u8],
        pub_keys: &[&[u8]],
        msg: &[u8],
    ) -> Result<(), QuorumError> {
        let sig = Signature::from_bytes(sig).map_err(|_| QuorumError::InvalidSignature)?;
        let keys = pub_keys
            .iter()
            .enumerate()
            .map(|(index, pk)| {
                PublicKey::key_validate(pk).map_err(|_| QuorumError::InvalidPublicKey { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let key_refs: Vec<&PublicKey> = keys.iter().collect();

        match sig.fast_aggregate_verify(true, msg, BLS_DST, &key_refs) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            _ => Err(QuorumError::InvalidSignature),
        }
    }
}
