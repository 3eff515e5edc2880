//! An in-memory Cosmos-style multistore producing real ics23 `ProofOps`.
//!
//! Substores are iavl-shaped trees of `key -> value`, the multistore is a
//! simple-Merkle tree of `store key -> substore root`. Every proof this
//! store emits verifies against `btcstamp_merkle::Ics23Verifier` and all
//! proofs share one application hash, which is what integration tests need.

use prost::Message;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tendermint_proto::crypto::{ProofOp, ProofOps};

const HASH_LEN: usize = 32;

type NodeHash = [u8; HASH_LEN];

// iavl leaf header: height 0, size 1 and version 1 as zigzag varints
const IAVL_LEAF_PREFIX: [u8; 3] = [0x00, 0x02, 0x02];
const SIMPLE_LEAF_PREFIX: [u8; 1] = [0x00];
const SIMPLE_INNER_PREFIX: [u8; 1] = [0x01];

// iavl inner header: height, size and version varints, then the length
// prefix of the left child hash. The height must grow toward the root;
// ics23 decodes it per inner op and requires at least the op's layer index.
fn iavl_inner_header(height: u8) -> Vec<u8> {
    vec![2 * height, 0x02, 0x04, HASH_LEN as u8]
}

fn sha256(data: &[u8]) -> NodeHash {
    Sha256::digest(data).into()
}

// keys stay short in tests, a single varint byte suffices
fn varint_len(data: &[u8]) -> u8 {
    u8::try_from(data.len()).expect("key or hash longer than 127 bytes")
}

fn iavl_leaf_hash(key: &[u8], value: &[u8]) -> NodeHash {
    let mut data = IAVL_LEAF_PREFIX.to_vec();
    data.push(varint_len(key));
    data.extend_from_slice(key);
    data.push(HASH_LEN as u8);
    data.extend_from_slice(&sha256(value));
    sha256(&data)
}

fn iavl_inner_hash(height: u8, left: &NodeHash, right: &NodeHash) -> NodeHash {
    let mut data = iavl_inner_header(height);
    data.extend_from_slice(left);
    data.push(HASH_LEN as u8);
    data.extend_from_slice(right);
    sha256(&data)
}

fn simple_leaf_hash(key: &[u8], value: &[u8]) -> NodeHash {
    let mut data = SIMPLE_LEAF_PREFIX.to_vec();
    data.push(varint_len(key));
    data.extend_from_slice(key);
    data.push(HASH_LEN as u8);
    data.extend_from_slice(&sha256(value));
    sha256(&data)
}

fn simple_inner_hash(_height: u8, left: &NodeHash, right: &NodeHash) -> NodeHash {
    let mut data = SIMPLE_INNER_PREFIX.to_vec();
    data.extend_from_slice(left);
    data.extend_from_slice(right);
    sha256(&data)
}

type InnerHashFn = fn(u8, &NodeHash, &NodeHash) -> NodeHash;

/// One step of a Merkle path, leaf to root: whether the proven node is the
/// left child, the sibling subtree's hash, and the parent node's height.
struct PathStep {
    node_is_left: bool,
    sibling: NodeHash,
    height: u8,
}

/// Hash and height of the subtree over `leaves`. Leaves sit at height 0, a
/// node sits one above its taller child.
fn tree_node(leaves: &[NodeHash], inner: InnerHashFn) -> (NodeHash, u8) {
    match leaves {
        [only] => (*only, 0),
        _ => {
            let mid = leaves.len() / 2;
            let (left, left_height) = tree_node(&leaves[..mid], inner);
            let (right, right_height) = tree_node(&leaves[mid..], inner);
            let height = 1 + left_height.max(right_height);
            (inner(height, &left, &right), height)
        }
    }
}

fn tree_root(leaves: &[NodeHash], inner: InnerHashFn) -> NodeHash {
    tree_node(leaves, inner).0
}

fn tree_path(leaves: &[NodeHash], index: usize, inner: InnerHashFn) -> Vec<PathStep> {
    if leaves.len() == 1 {
        return Vec::new();
    }
    // recursion yields the steps leaf to root, the order ics23 expects
    let mid = leaves.len() / 2;
    let (left, left_height) = tree_node(&leaves[..mid], inner);
    let (right, right_height) = tree_node(&leaves[mid..], inner);
    let height = 1 + left_height.max(right_height);
    if index < mid {
        let mut path = tree_path(&leaves[..mid], index, inner);
        path.push(PathStep {
            node_is_left: true,
            sibling: right,
            height,
        });
        path
    } else {
        let mut path = tree_path(&leaves[mid..], index - mid, inner);
        path.push(PathStep {
            node_is_left: false,
            sibling: left,
            height,
        });
        path
    }
}

fn iavl_inner_op(step: &PathStep) -> ics23::InnerOp {
    let mut prefix = iavl_inner_header(step.height);
    let mut suffix = Vec::new();
    if step.node_is_left {
        suffix.push(HASH_LEN as u8);
        suffix.extend_from_slice(&step.sibling);
    } else {
        prefix.extend_from_slice(&step.sibling);
        prefix.push(HASH_LEN as u8);
    }
    ics23::InnerOp {
        hash: ics23::HashOp::Sha256.into(),
        prefix,
        suffix,
    }
}

fn simple_inner_op(step: &PathStep) -> ics23::InnerOp {
    let mut prefix = SIMPLE_INNER_PREFIX.to_vec();
    let mut suffix = Vec::new();
    if step.node_is_left {
        suffix.extend_from_slice(&step.sibling);
    } else {
        prefix.extend_from_slice(&step.sibling);
    }
    ics23::InnerOp {
        hash: ics23::HashOp::Sha256.into(),
        prefix,
        suffix,
    }
}

fn iavl_leaf_op() -> ics23::LeafOp {
    ics23::LeafOp {
        hash: ics23::HashOp::Sha256.into(),
        prehash_key: ics23::HashOp::NoHash.into(),
        prehash_value: ics23::HashOp::Sha256.into(),
        length: ics23::LengthOp::VarProto.into(),
        prefix: IAVL_LEAF_PREFIX.to_vec(),
    }
}

fn simple_leaf_op() -> ics23::LeafOp {
    ics23::LeafOp {
        hash: ics23::HashOp::Sha256.into(),
        prehash_key: ics23::HashOp::NoHash.into(),
        prehash_value: ics23::HashOp::Sha256.into(),
        length: ics23::LengthOp::VarProto.into(),
        prefix: SIMPLE_LEAF_PREFIX.to_vec(),
    }
}

fn existence_proof(
    key: &[u8],
    value: &[u8],
    leaf: ics23::LeafOp,
    path: Vec<ics23::InnerOp>,
) -> Vec<u8> {
    let proof = ics23::CommitmentProof {
        proof: Some(ics23::commitment_proof::Proof::Exist(
            ics23::ExistenceProof {
                key: key.to_vec(),
                value: value.to_vec(),
                leaf: Some(leaf),
                path,
            },
        )),
    };
    proof.encode_to_vec()
}

/// The in-memory multistore. Substore and key iteration order is the sorted
/// byte order of `BTreeMap`, so the application hash is deterministic.
#[derive(Default)]
pub struct MultiStore {
    stores: BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MultiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, store_key: &str, key: Vec<u8>, value: Vec<u8>) {
        self.stores
            .entry(store_key.to_string())
            .or_default()
            .insert(key, value);
    }

    fn substore_leaves(store: &BTreeMap<Vec<u8>, Vec<u8>>) -> Vec<NodeHash> {
        store
            .iter()
            .map(|(k, v)| iavl_leaf_hash(k, v))
            .collect()
    }

    fn substore_root(store: &BTreeMap<Vec<u8>, Vec<u8>>) -> NodeHash {
        tree_root(&Self::substore_leaves(store), iavl_inner_hash)
    }

    fn multistore_leaves(&self) -> Vec<NodeHash> {
        self.stores
            .iter()
            .map(|(store_key, store)| {
                simple_leaf_hash(store_key.as_bytes(), &Self::substore_root(store))
            })
            .collect()
    }

    /// Root committing to every substore, i.e. the block's application hash.
    pub fn app_hash(&self) -> Vec<u8> {
        tree_root(&self.multistore_leaves(), simple_inner_hash).to_vec()
    }

    /// Two-op inclusion proof of `key` within `store_key`, rooted at
    /// [`Self::app_hash`].
    pub fn prove(&self, store_key: &str, key: &[u8]) -> Result<ProofOps, String> {
        let store = self
            .stores
            .get(store_key)
            .ok_or_else(|| format!("no substore {store_key}"))?;
        let value = store
            .get(key)
            .ok_or_else(|| format!("no key {} in {store_key}", hex::encode(key)))?;

        let key_index = store
            .keys()
            .position(|k| k.as_slice() == key)
            .expect("key present");
        let leaves = Self::substore_leaves(store);
        let iavl_path = tree_path(&leaves, key_index, iavl_inner_hash)
            .iter()
            .map(iavl_inner_op)
            .collect();
        let iavl_op = ProofOp {
            r#type: btcstamp_merkle::PROOF_OP_IAVL.to_string(),
            key: key.to_vec(),
            data: existence_proof(key, value, iavl_leaf_op(), iavl_path),
        };

        let store_index = self
            .stores
            .keys()
            .position(|k| k == store_key)
            .expect("substore present");
        let substore_root = Self::substore_root(store);
        let multistore_leaves = self.multistore_leaves();
        let simple_path = tree_path(&multistore_leaves, store_index, simple_inner_hash)
            .iter()
            .map(simple_inner_op)
            .collect();
        let simple_op = ProofOp {
            r#type: btcstamp_merkle::PROOF_OP_SIMPLE.to_string(),
            key: store_key.as_bytes().to_vec(),
            data: existence_proof(
                store_key.as_bytes(),
                &substore_root,
                simple_leaf_op(),
                simple_path,
            ),
        };

        Ok(ProofOps {
            ops: vec![iavl_op, simple_op],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btcstamp_merkle::{CommitmentVerifier, Ics23Verifier};

    fn populated() -> MultiStore {
        let mut store = MultiStore::new();
        store.set("headers", b"h1".to_vec(), b"header one".to_vec());
        store.set("headers", b"h2".to_vec(), b"header two".to_vec());
        store.set("headers", b"h3".to_vec(), b"header three".to_vec());
        store.set("headers", b"h4".to_vec(), b"header four".to_vec());
        store.set("headers", b"h5".to_vec(), b"header five".to_vec());
        store.set("epochs", b"e1".to_vec(), b"epoch one".to_vec());
        store.set("valsets", b"e1".to_vec(), b"valset one".to_vec());
        store
    }

    // a five-leaf substore exercises multi-op iavl paths in both directions,
    // including the middle leaves whose inner ops sit above height 1
    #[test]
    fn every_entry_proves_against_the_shared_app_hash() {
        let store = populated();
        let root = store.app_hash();
        let verifier = Ics23Verifier;

        for (store_key, key, value) in [
            ("headers", b"h1".as_slice(), b"header one".as_slice()),
            ("headers", b"h2", b"header two"),
            ("headers", b"h3", b"header three"),
            ("headers", b"h4", b"header four"),
            ("headers", b"h5", b"header five"),
            ("epochs", b"e1", b"epoch one"),
            ("valsets", b"e1", b"valset one"),
        ] {
            let proof = store.prove(store_key, key).unwrap();
            verifier
                .verify_inclusion(&root, store_key, key, value, &proof)
                .unwrap_or_else(|e| panic!("{store_key}/{}: {e}", String::from_utf8_lossy(key)));
        }
    }

    #[test]
    fn wrong_value_fails_verification() {
        let store = populated();
        let root = store.app_hash();
        let proof = store.prove("epochs", b"e1").unwrap();
        assert!(Ics23Verifier
            .verify_inclusion(&root, "epochs", b"e1", b"epoch two", &proof)
            .is_err());
    }

    #[test]
    fn updating_a_substore_moves_the_app_hash() {
        let mut store = populated();
        let before = store.app_hash();
        store.set("headers", b"h6".to_vec(), b"header six".to_vec());
        let after = store.app_hash();
        assert_ne!(before, after);

        // old proofs do not verify against the new root
        let proof = store.prove("epochs", b"e1").unwrap();
        assert!(Ics23Verifier
            .verify_inclusion(&before, "epochs", b"e1", b"epoch one", &proof)
            .is_err());
        assert!(Ics23Verifier
            .verify_inclusion(&after, "epochs", b"e1", b"epoch one", &proof)
            .is_ok());
    }
}
