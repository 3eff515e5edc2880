//! Generic key/value store-inclusion proofs.
//!
//! The protocol needs to check that a value is present under a key in a
//! Merkle-ized multistore, rooted at a block's application hash. The
//! commitment scheme itself belongs to the host store; this module only
//! defines the contract ([`CommitmentVerifier`]) and ships the standard
//! implementation for Cosmos-style two-level proofs: an ics23 iavl proof of
//! `key -> value` under the substore root, chained into an ics23
//! simple-Merkle proof of `store_key -> substore root` under the app hash.

use crate::error::MerkleError;
use prost::Message;
use tendermint_proto::crypto::ProofOps;

/// Proof op type of an iavl substore membership proof.
pub const PROOF_OP_IAVL: &str = "ics23:iavl";
/// Proof op type of a simple-Merkle multistore membership proof.
pub const PROOF_OP_SIMPLE: &str = "ics23:simple";

/// Contract for store-inclusion verification: given a root, a store key, a
/// key path and a value, the proof must deterministically recompute the root.
pub trait CommitmentVerifier {
    fn verify_inclusion(
        &self,
        root: &[u8],
        store_key: &str,
        key: &[u8],
        value: &[u8],
        proof: &ProofOps,
    ) -> Result<(), MerkleError>;
}

/// ics23-backed [`CommitmentVerifier`] for Cosmos multistore `ProofOps`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ics23Verifier;

fn decode_op(index: usize, data: &[u8]) -> Result<ics23::CommitmentProof, MerkleError> {
    ics23::CommitmentProof::decode(data).map_err(|e| MerkleError::ProofOpDecode {
        index,
        reason: e.to_string(),
    })
}

fn existence_proof(
    index: usize,
    proof: &ics23::CommitmentProof,
) -> Result<&ics23::ExistenceProof, MerkleError> {
    match proof.proof.as_ref() {
        Some(ics23::commitment_proof::Proof::Exist(exist)) => Ok(exist),
        _ => Err(MerkleError::NonExistenceProof { index }),
    }
}

impl CommitmentVerifier for Ics23Verifier {
    fn verify_inclusion(
        &self,
        root: &[u8],
        store_key: &str,
        key: &[u8],
        value: &[u8],
        proof: &ProofOps,
    ) -> Result<(), MerkleError> {
        if proof.ops.len() != 2 {
            return Err(MerkleError::InvalidProofOpCount {
                expected: 2,
                got: proof.ops.len(),
            });
        }
        let substore_op = &proof.ops[0];
        let multistore_op = &proof.ops[1];

        if substore_op.r#type != PROOF_OP_IAVL || substore_op.key != key {
            return Err(MerkleError::ProofOpKeyMismatch { index: 0 });
        }
        if multistore_op.r#type != PROOF_OP_SIMPLE || multistore_op.key != store_key.as_bytes() {
            return Err(MerkleError::ProofOpKeyMismatch { index: 1 });
        }

        // substore: key -> value under the substore root
        let substore_proof = decode_op(0, &substore_op.data)?;
        let substore_root = ics23::calculate_existence_root::<ics23::HostFunctionsManager>(
            existence_proof(0, &substore_proof)?,
        )
        .map_err(|e| MerkleError::ProofOpDecode {
            index: 0,
            reason: e.to_string(),
        })?;
        if !ics23::verify_membership::<ics23::HostFunctionsManager>(
            &substore_proof,
            &ics23::iavl_spec(),
            &substore_root,
            key,
            value,
        ) {
            return Err(MerkleError::StoreRootMismatch);
        }

        // multistore: store_key -> substore root under the app hash
        let multistore_proof = decode_op(1, &multistore_op.data)?;
        if !ics23::verify_membership::<ics23::HostFunctionsManager>(
            &multistore_proof,
            &ics23::tendermint_spec(),
            &root.to_vec(),
            store_key.as_bytes(),
            &substore_root,
        ) {
            return Err(MerkleError::StoreRootMismatch);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendermint_proto::crypto::ProofOp;

    // A minimal single-leaf iavl tree: the existence proof has an empty path,
    // so the substore root is just the leaf hash.
    fn iavl_exist(key: &[u8], value: &[u8]) -> ics23::CommitmentProof {
        ics23::CommitmentProof {
            proof: Some(ics23::commitment_proof::Proof::Exist(
                ics23::ExistenceProof {
                    key: key.to_vec(),
                    value: value.to_vec(),
                    leaf: Some(ics23::LeafOp {
                        hash: ics23::HashOp::Sha256.into(),
                        prehash_key: ics23::HashOp::NoHash.into(),
                        prehash_value: ics23::HashOp::Sha256.into(),
                        length: ics23::LengthOp::VarProto.into(),
                        // iavl leaf prefix: height 0, size 1, version 1
                        prefix: vec![0x00, 0x02, 0x02],
                    }),
                    path: vec![],
                },
            )),
        }
    }

    fn simple_exist(key: &[u8], value: &[u8]) -> ics23::CommitmentProof {
        ics23::CommitmentProof {
            proof: Some(ics23::commitment_proof::Proof::Exist(
                ics23::ExistenceProof {
                    key: key.to_vec(),
                    value: value.to_vec(),
                    leaf: Some(ics23::LeafOp {
                        hash: ics23::HashOp::Sha256.into(),
                        prehash_key: ics23::HashOp::NoHash.into(),
                        prehash_value: ics23::HashOp::Sha256.into(),
                        length: ics23::LengthOp::VarProto.into(),
                        prefix: vec![0x00],
                    }),
                    path: vec![],
                },
            )),
        }
    }

    fn single_leaf_proof_ops(store_key: &str, key: &[u8], value: &[u8]) -> (Vec<u8>, ProofOps) {
        let substore_proof = iavl_exist(key, value);
        let substore_root = ics23::calculate_existence_root::<ics23::HostFunctionsManager>(
            existence_proof(0, &substore_proof).unwrap(),
        )
        .unwrap();

        let multistore_proof = simple_exist(store_key.as_bytes(), &substore_root);
        let app_hash = ics23::calculate_existence_root::<ics23::HostFunctionsManager>(
            existence_proof(1, &multistore_proof).unwrap(),
        )
        .unwrap();

        let ops = ProofOps {
            ops: vec![
                ProofOp {
                    r#type: PROOF_OP_IAVL.into(),
                    key: key.to_vec(),
                    data: substore_proof.encode_to_vec(),
                },
                ProofOp {
                    r#type: PROOF_OP_SIMPLE.into(),
                    key: store_key.as_bytes().to_vec(),
                    data: multistore_proof.encode_to_vec(),
                },
            ],
        };
        (app_hash, ops)
    }

    #[test]
    fn verifies_single_leaf_two_level_proof() {
        let (app_hash, ops) = single_leaf_proof_ops("epoching", b"epoch/7", b"metadata");
        Ics23Verifier
            .verify_inclusion(&app_hash, "epoching", b"epoch/7", b"metadata", &ops)
            .unwrap();
    }

    #[test]
    fn rejects_wrong_value() {
        let (app_hash, ops) = single_leaf_proof_ops("epoching", b"epoch/7", b"metadata");
        let err = Ics23Verifier
            .verify_inclusion(&app_hash, "epoching", b"epoch/7", b"other", &ops)
            .unwrap_err();
        assert_eq!(err, MerkleError::StoreRootMismatch);
    }

    #[test]
    fn rejects_wrong_root() {
        let (mut app_hash, ops) = single_leaf_proof_ops("epoching", b"epoch/7", b"metadata");
        app_hash[0] ^= 0x01;
        let err = Ics23Verifier
            .verify_inclusion(&app_hash, "epoching", b"epoch/7", b"metadata", &ops)
            .unwrap_err();
        assert_eq!(err, MerkleError::StoreRootMismatch);
    }

    #[test]
    fn rejects_mismatched_op_keys() {
        let (app_hash, ops) = single_leaf_proof_ops("epoching", b"epoch/7", b"metadata");
        let err = Ics23Verifier
            .verify_inclusion(&app_hash, "epoching", b"epoch/8", b"metadata", &ops)
            .unwrap_err();
        assert_eq!(err, MerkleError::ProofOpKeyMismatch { index: 0 });

        let err = Ics23Verifier
            .verify_inclusion(&app_hash, "staking", b"epoch/7", b"metadata", &ops)
            .unwrap_err();
        assert_eq!(err, MerkleError::ProofOpKeyMismatch { index: 1 });
    }

    #[test]
    fn rejects_wrong_op_count() {
        let (app_hash, mut ops) = single_leaf_proof_ops("epoching", b"epoch/7", b"metadata");
        ops.ops.pop();
        let err = Ics23Verifier
            .verify_inclusion(&app_hash, "epoching", b"epoch/7", b"metadata", &ops)
            .unwrap_err();
        assert_eq!(
            err,
            MerkleError::InvalidProofOpCount {
                expected: 2,
                got: 1
            }
        );
    }
}
