//! Bitcoin transaction Merkle branches.
//!
//! Branches are carried over the wire as a flat concatenation of 32-byte
//! sibling hashes, ordered leaf to root, matching Bitcoin's Merkle tree
//! convention (double SHA-256, odd levels duplicate their last node).

use crate::error::MerkleError;
use sha2::{Digest, Sha256};

pub const HASH_LEN: usize = 32;

/// Concatenates and double-hashes the two inputs.
fn hash_concat(left: &[u8], right: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let first = hasher.finalize();
    Sha256::digest(first).into()
}

fn to_nodes(leaves: &[Vec<u8>]) -> Result<Vec<[u8; HASH_LEN]>, MerkleError> {
    leaves
        .iter()
        .map(|leaf| {
            leaf.as_slice()
                .try_into()
                .map_err(|_| MerkleError::InvalidHashLength {
                    expected: HASH_LEN,
                    got: leaf.len(),
                })
        })
        .collect()
}

fn next_level(nodes: &[[u8; HASH_LEN]]) -> Vec<[u8; HASH_LEN]> {
    nodes
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_concat(left, right),
            // odd-sized level, the last node is paired with itself
            [last] => hash_concat(last, last),
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

/// Computes the Merkle root over the given leaf hashes (transaction ids).
pub fn compute_merkle_root(leaves: &[Vec<u8>]) -> Result<[u8; HASH_LEN], MerkleError> {
    let mut level = to_nodes(leaves)?;
    if level.is_empty() {
        return Err(MerkleError::EmptyLeafSet);
    }
    while level.len() > 1 {
        level = next_level(&level);
    }
    Ok(level[0])
}

/// Builds the Merkle branch for the leaf at `index`: the flat concatenation
/// of sibling hashes from the leaf's level up to the root's children.
///
/// At each level the sibling of `index` is `nodes[min(index ^ 1, len - 1)]`,
/// i.e. the last node of an odd-sized level is its own sibling.
pub fn build_branch(leaves: &[Vec<u8>], index: usize) -> Result<Vec<u8>, MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyLeafSet);
    }
    if index >= leaves.len() {
        return Err(MerkleError::IndexOutOfRange {
            index,
            len: leaves.len(),
        });
    }

    let mut level = to_nodes(leaves)?;
    let mut branch = Vec::new();
    let mut index = index;
    while level.len() > 1 {
        let sibling = level[std::cmp::min(index ^ 1, level.len() - 1)];
        branch.extend_from_slice(&sibling);
        level = next_level(&level);
        index >>= 1;
    }
    Ok(branch)
}

/// Verifies a flat `leaf || siblings || root` proof by walking up the tree,
/// recombining left/right per the parity of `index` at each step.
fn verify_flat(proof: &[u8], mut index: u32) -> bool {
    if proof.len() % HASH_LEN != 0 {
        return false;
    }
    if proof.len() == HASH_LEN {
        return true;
    }
    // a two-hash proof carries no sibling to recombine with and is malformed
    if proof.len() == 2 * HASH_LEN {
        return false;
    }

    let root = &proof[proof.len() - HASH_LEN..];
    let mut current: [u8; HASH_LEN] = proof[..HASH_LEN].try_into().expect("length checked");

    let num_steps = proof.len() / HASH_LEN - 1;
    for i in 1..num_steps {
        let sibling = &proof[i * HASH_LEN..(i + 1) * HASH_LEN];
        current = if index % 2 == 1 {
            hash_concat(sibling, &current)
        } else {
            hash_concat(&current, sibling)
        };
        index >>= 1;
    }

    current == root
}

/// Verifies that `leaf_hash` is committed at position `index` under
/// `root_hash` via the flat `siblings` branch.
///
/// A single-leaf tree is the shortcut case: the leaf is the root and the
/// branch is empty.
pub fn verify_branch(leaf_hash: &[u8], root_hash: &[u8], siblings: &[u8], index: u32) -> bool {
    if leaf_hash.len() != HASH_LEN || root_hash.len() != HASH_LEN {
        return false;
    }
    if leaf_hash == root_hash && siblings.is_empty() && index == 0 {
        return true;
    }

    let mut proof = Vec::with_capacity(2 * HASH_LEN + siblings.len());
    proof.extend_from_slice(leaf_hash);
    proof.extend_from_slice(siblings);
    proof.extend_from_slice(root_hash);
    verify_flat(&proof, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn rand_leaves(n: usize) -> Vec<Vec<u8>> {
        let mut rng = rand::thread_rng();
        (0..n)
            .map(|_| {
                let mut leaf = vec![0u8; HASH_LEN];
                rng.fill_bytes(&mut leaf);
                leaf
            })
            .collect()
    }

    #[test]
    fn single_leaf_tree_is_its_own_root() {
        let leaves = rand_leaves(1);
        let root = compute_merkle_root(&leaves).unwrap();
        assert_eq!(root.as_slice(), leaves[0].as_slice());

        let branch = build_branch(&leaves, 0).unwrap();
        assert!(branch.is_empty());
        assert!(verify_branch(&leaves[0], &root, &branch, 0));
    }

    #[test]
    fn five_leaf_tree_branches_reproduce_the_root() {
        let leaves = rand_leaves(5);
        let root = compute_merkle_root(&leaves).unwrap();

        for (i, leaf) in leaves.iter().enumerate() {
            let branch = build_branch(&leaves, i).unwrap();
            assert!(
                verify_branch(leaf, &root, &branch, i as u32),
                "branch for leaf {i} did not verify"
            );
        }

        // leaf 2's branch against a wrong position fails
        let branch = build_branch(&leaves, 2).unwrap();
        assert!(!verify_branch(&leaves[2], &root, &branch, 3));
    }

    #[test]
    fn corrupted_branch_fails() {
        let leaves = rand_leaves(8);
        let root = compute_merkle_root(&leaves).unwrap();
        let mut branch = build_branch(&leaves, 3).unwrap();
        branch[7] ^= 0xff;
        assert!(!verify_branch(&leaves[3], &root, &branch, 3));
    }

    #[test]
    fn malformed_proofs_are_rejected() {
        let leaves = rand_leaves(2);
        let root = compute_merkle_root(&leaves).unwrap();

        // empty branch with leaf != root: flat proof of exactly two hashes
        assert!(!verify_branch(&leaves[0], &root, &[], 0));

        // branch not a multiple of the hash size
        let branch = build_branch(&leaves, 0).unwrap();
        assert!(!verify_branch(&leaves[0], &root, &branch[..31], 0));
    }

    #[test]
    fn build_branch_input_validation() {
        assert_eq!(
            build_branch(&[], 0).unwrap_err(),
            MerkleError::EmptyLeafSet
        );
        let leaves = rand_leaves(3);
        assert_eq!(
            build_branch(&leaves, 3).unwrap_err(),
            MerkleError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn duplicate_last_node_rule_matches_even_padding() {
        // a 3-leaf tree hashes its last node with itself at the first level
        let leaves = rand_leaves(3);
        let root = compute_merkle_root(&leaves).unwrap();

        let mut padded = leaves.clone();
        padded.push(leaves[2].clone());
        let padded_root = compute_merkle_root(&padded).unwrap();
        assert_eq!(root, padded_root);
    }
}
