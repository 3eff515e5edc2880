//! Synthetic protocol data: BLS-signed checkpoints, OP_RETURN transactions
//! and mined (low-difficulty) BTC blocks carrying them.

use bitcoin::absolute::LockTime;
use bitcoin::blockdata::opcodes;
use bitcoin::transaction::{TxOut, Version as TxVersion};
use bitcoin::{Amount, BlockHash, ScriptBuf, TxMerkleNode};
use blst::min_sig::{AggregateSignature, SecretKey};
use btcstamp_bitcoin::{
    serialize, verify_header_pow, BlockHeader, Hash, Network, Transaction, Version,
};
use btcstamp_ledger::BtcSpvProof;
use btcstamp_merkle::{build_branch, compute_merkle_root};
use btcstamp_quorum::{signed_msg, ValidatorWithBlsKey, BLS_DST};
use btcstamp_wire::{
    encode_checkpoint, RawBtcCheckpoint, Tag, ADDRESS_LEN, BITMAP_LEN, CURRENT_VERSION,
    LAST_COMMIT_HASH_LEN,
};
use rand::{Rng, RngCore};

/// Generate random bytes of specified length using the provided RNG
pub fn gen_random_bytes<R: RngCore>(rng: &mut R, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen()).collect()
}

pub fn gen_bls_keys<R: RngCore>(rng: &mut R, n: usize) -> Vec<SecretKey> {
    (0..n)
        .map(|_| {
            let mut ikm = [0u8; 32];
            rng.fill_bytes(&mut ikm);
            SecretKey::key_gen(&ikm, &[]).unwrap()
        })
        .collect()
}

/// Equal-weight validator set over the given BLS keys.
pub fn validator_set(keys: &[SecretKey]) -> Vec<ValidatorWithBlsKey> {
    keys.iter()
        .enumerate()
        .map(|(i, sk)| ValidatorWithBlsKey {
            addr: format!("val{i}"),
            bls_pub_key: sk.sk_to_pk().compress().to_vec(),
            voting_power: 1,
        })
        .collect()
}

/// A checkpoint for `epoch` carrying a real aggregated signature by the
/// validators at the `signers` indices, with a matching bitmap.
pub fn gen_signed_checkpoint<R: RngCore>(
    rng: &mut R,
    keys: &[SecretKey],
    signers: &[usize],
    epoch: u64,
) -> RawBtcCheckpoint {
    let last_commit_hash = gen_random_bytes(rng, LAST_COMMIT_HASH_LEN);
    let msg = signed_msg(epoch, &last_commit_hash);

    let sigs: Vec<_> = signers
        .iter()
        .map(|&i| keys[i].sign(&msg, BLS_DST, &[]))
        .collect();
    let sig_refs: Vec<_> = sigs.iter().collect();
    let agg = AggregateSignature::aggregate(&sig_refs, true).unwrap();

    let mut bitmap = vec![0u8; BITMAP_LEN];
    for &i in signers {
        bitmap[i / 8] |= 1 << (i % 8);
    }

    RawBtcCheckpoint {
        epoch,
        last_commit_hash,
        bitmap,
        submitter_address: gen_random_bytes(rng, ADDRESS_LEN),
        bls_sig: agg.to_signature().compress().to_vec(),
    }
}

/// A transaction whose first output is an OP_RETURN push of `data`, plus a
/// random payment output so that equal payloads still yield distinct txids.
pub fn build_op_return_tx<R: RngCore>(rng: &mut R, data: &[u8]) -> Transaction {
    assert!(data.len() <= 80, "OP_RETURN payload too long");
    let mut script = vec![opcodes::all::OP_RETURN.to_u8()];
    if data.len() > 75 {
        script.push(opcodes::all::OP_PUSHDATA1.to_u8());
    }
    script.push(data.len() as u8);
    script.extend_from_slice(data);

    Transaction {
        version: TxVersion::TWO,
        lock_time: LockTime::ZERO,
        input: vec![],
        output: vec![
            TxOut {
                value: Amount::ZERO,
                script_pubkey: ScriptBuf::from_bytes(script),
            },
            TxOut {
                value: Amount::from_sat(rng.gen_range(1..100_000)),
                script_pubkey: ScriptBuf::from_bytes(gen_random_bytes(rng, 25)),
            },
        ],
    }
}

/// A transaction without any OP_RETURN output, used as block filler.
pub fn gen_filler_tx<R: RngCore>(rng: &mut R) -> Transaction {
    Transaction {
        version: TxVersion::TWO,
        lock_time: LockTime::ZERO,
        input: vec![],
        output: vec![TxOut {
            value: Amount::from_sat(rng.gen_range(1..100_000)),
            script_pubkey: ScriptBuf::from_bytes(gen_random_bytes(rng, 25)),
        }],
    }
}

/// A mined block: a header whose Merkle root commits to `txs` and whose
/// proof of work passes the network's limit.
pub struct BtcBlock {
    pub header: BlockHeader,
    pub txs: Vec<Transaction>,
}

impl BtcBlock {
    pub fn block_hash(&self) -> Vec<u8> {
        self.header.block_hash().to_byte_array().to_vec()
    }

    fn txids(&self) -> Vec<Vec<u8>> {
        self.txs
            .iter()
            .map(|tx| tx.compute_txid().to_byte_array().to_vec())
            .collect()
    }

    /// SPV proof for the transaction at `index`.
    pub fn spv_proof(&self, index: usize) -> BtcSpvProof {
        let nodes = build_branch(&self.txids(), index).unwrap();
        BtcSpvProof {
            btc_transaction: serialize(&self.txs[index]),
            btc_transaction_index: index as u32,
            merkle_nodes: nodes,
            confirming_btc_header: serialize(&self.header),
        }
    }
}

/// Mines a block over `txs` against the network's difficulty limit. Only
/// meaningful for low-difficulty networks such as regtest.
pub fn gen_block<R: RngCore>(rng: &mut R, network: Network, txs: Vec<Transaction>) -> BtcBlock {
    assert!(!txs.is_empty(), "a block needs at least one transaction");
    let chain_params = network.chain_params();

    let txids: Vec<Vec<u8>> = txs
        .iter()
        .map(|tx| tx.compute_txid().to_byte_array().to_vec())
        .collect();
    let root = compute_merkle_root(&txids).unwrap();

    let mut header = BlockHeader {
        version: Version::TWO,
        prev_blockhash: BlockHash::from_byte_array(rng.gen()),
        merkle_root: TxMerkleNode::from_byte_array(root),
        time: rng.gen(),
        bits: chain_params.max_attainable_target.to_compact_lossy(),
        nonce: 0,
    };
    while verify_header_pow(&chain_params, &header).is_err() {
        header.nonce += 1;
    }

    BtcBlock { header, txs }
}

/// A full checkpoint submission: two mined blocks, each holding one
/// OP_RETURN half among filler transactions, and the SPV proofs for both.
pub struct CheckpointSubmission {
    pub proofs: [BtcSpvProof; 2],
    pub blocks: [BtcBlock; 2],
}

pub fn gen_checkpoint_submission<R: RngCore>(
    rng: &mut R,
    network: Network,
    tag: Tag,
    ckpt: &RawBtcCheckpoint,
) -> CheckpointSubmission {
    let (first, second) = encode_checkpoint(tag, CURRENT_VERSION, ckpt).unwrap();

    let blocks = [first, second].map(|half| {
        let txs = vec![
            gen_filler_tx(rng),
            build_op_return_tx(rng, &half),
            gen_filler_tx(rng),
        ];
        gen_block(rng, network, txs)
    });
    let proofs = [blocks[0].spv_proof(1), blocks[1].spv_proof(1)];

    CheckpointSubmission { proofs, blocks }
}
