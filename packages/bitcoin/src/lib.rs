pub mod error;

use bitcoin::blockdata::opcodes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use bitcoin::{
    block::{Header as BlockHeader, Version},
    consensus::encode::Error as EncodeError,
    consensus::{deserialize, serialize, Params},
    hash_types,
    hashes::hex::HexToArrayError as HexError,
    hashes::{sha256d, Hash},
    BlockHash, CompactTarget, Target, Transaction, Txid, Work,
};

pub type Result<T> = std::result::Result<T, error::Error>;

// we re-implement the enum here since `rust-bitcoin`'s enum implementation
// does not have `#[derive(Serialize, Deserialize)]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    pub fn chain_params(&self) -> Params {
        match self {
            Self::Mainnet => Params::new(bitcoin::Network::Bitcoin),
            Self::Testnet => Params::new(bitcoin::Network::Testnet),
            Self::Signet => Params::new(bitcoin::Network::Signet),
            Self::Regtest => Params::new(bitcoin::Network::Regtest),
        }
    }

    pub fn bitcoin_network(&self) -> bitcoin::Network {
        match self {
            Self::Mainnet => bitcoin::Network::Bitcoin,
            Self::Testnet => bitcoin::Network::Testnet,
            Self::Signet => bitcoin::Network::Signet,
            Self::Regtest => bitcoin::Network::Regtest,
        }
    }
}

/// Checks a header's proof of work: its target must not exceed the chain's
/// PoW limit, and its hash must meet that target.
pub fn verify_header_pow(chain_params: &Params, header: &BlockHeader) -> Result<()> {
    let target = header.target();
    if target > chain_params.max_attainable_target {
        return Err(error::Error::TargetTooLarge);
    }
    // validate_pow also re-checks that the passed target matches the header's
    // own, which is trivially true here; the hash comparison is what counts
    header
        .validate_pow(target)
        .map_err(error::Error::InvalidProofOfWork)?;
    Ok(())
}

/// Returns the payload of the first OP_RETURN output of the transaction.
pub fn extract_op_return_data(tx: &Transaction) -> Result<Vec<u8>> {
    for output in tx.output.iter() {
        if output.script_pubkey.is_op_return() {
            let pk_script = output.script_pubkey.as_bytes();

            // if this is OP_PUSHDATA1, we need to drop first 3 bytes as those are related
            // to script itself i.e OP_RETURN + OP_PUSHDATA1 + len of bytes
            if pk_script.len() > 1 && pk_script[1] == opcodes::all::OP_PUSHDATA1.to_u8() {
                return Ok(pk_script[3..pk_script.len()].to_vec());
            } else {
                return Ok(pk_script[2.min(pk_script.len())..pk_script.len()].to_vec());
            }
        }
    }
    Err(error::Error::NoOpReturn)
}
