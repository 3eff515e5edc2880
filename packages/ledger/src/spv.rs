//! SPV proof parsing: one checkpoint half as seen on BTC.

use crate::error::LedgerError;
use crate::types::TransactionKey;
use btcstamp_bitcoin::{
    deserialize, extract_op_return_data, verify_header_pow, BlockHeader, Hash, Transaction,
};
use btcstamp_merkle::verify_branch;
use cosmwasm_schema::cw_serde;

/// A BTC transaction together with its inclusion evidence: the confirming
/// header and the transaction's Merkle branch within that block.
#[cw_serde]
pub struct BtcSpvProof {
    /// Consensus-serialized transaction carrying one OP_RETURN half.
    pub btc_transaction: Vec<u8>,
    pub btc_transaction_index: u32,
    /// Flat concatenation of the branch's 32-byte sibling hashes.
    pub merkle_nodes: Vec<u8>,
    /// Consensus-serialized confirming header.
    pub confirming_btc_header: Vec<u8>,
}

/// The validated contents of one [`BtcSpvProof`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedProof {
    pub key: TransactionKey,
    pub op_return_data: Vec<u8>,
    pub transaction: Vec<u8>,
    pub header: Vec<u8>,
}

/// Validates one SPV proof: header PoW against the chain params, the
/// transaction's Merkle branch against the header's root, and the presence
/// of an OP_RETURN payload.
pub fn parse_proof(
    chain_params: &btcstamp_bitcoin::Params,
    proof: &BtcSpvProof,
) -> Result<ParsedProof, LedgerError> {
    let header: BlockHeader = deserialize(&proof.confirming_btc_header)
        .map_err(|e| LedgerError::HeaderDecode(e.to_string()))?;
    verify_header_pow(chain_params, &header)?;

    let tx: Transaction = deserialize(&proof.btc_transaction)
        .map_err(|e| LedgerError::TxDecode(e.to_string()))?;

    let txid = tx.compute_txid().to_byte_array();
    let root = header.merkle_root.to_byte_array();
    if !verify_branch(
        &txid,
        &root,
        &proof.merkle_nodes,
        proof.btc_transaction_index,
    ) {
        return Err(LedgerError::InvalidMerkleProof);
    }

    let op_return_data = extract_op_return_data(&tx)?;

    Ok(ParsedProof {
        key: TransactionKey {
            index: proof.btc_transaction_index,
            hash: header.block_hash().to_byte_array().to_vec(),
        },
        op_return_data,
        transaction: proof.btc_transaction.clone(),
        header: proof.confirming_btc_header.clone(),
    })
}
