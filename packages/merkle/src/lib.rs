//! Merkle inclusion proofs used by the timestamping protocol:
//!
//! - [`btc`]: Bitcoin-style transaction branches (double SHA-256, flattened
//!   tree with the duplicate-last-node rule for odd levels).
//! - [`store`]: the generic key/value store-inclusion contract, with an
//!   ics23-backed verifier for Cosmos-style `ProofOps`.

mod btc;
mod error;
mod store;

pub use self::btc::{build_branch, compute_merkle_root, verify_branch, HASH_LEN};
pub use self::error::MerkleError;
pub use self::store::{CommitmentVerifier, Ics23Verifier, PROOF_OP_IAVL, PROOF_OP_SIMPLE};
