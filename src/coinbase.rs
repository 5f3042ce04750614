//! Coinbase transaction construction

use serde::{Deserialize, Serialize};

use crate::constants::MAX_COINBASE_DATA_LENGTH;
use crate::error::Result;
use crate::hash::sha256_hex;
use crate::time::unix_millis;
use crate::types::*;

/// Payload encoded into `CoinbaseTxIn::data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinbaseData {
    pub block_height: Natural,
    #[serde(default)]
    pub miner_data: String,
}

/// CreateCoinbase: ℕ × 𝔸 × 𝕂 × ℝ × 𝕊? → 𝒞𝒯𝒳
///
/// Build the reward transaction for `block_height`, stamped with the current
/// time. Miner data beyond 100 bytes is dropped.
pub fn create_coinbase_transaction(
    block_height: Natural,
    payee_address: &str,
    payee_public_key: &str,
    reward: Amount,
    miner_data: Option<&str>,
) -> Result<CoinbaseTransaction> {
    create_coinbase_transaction_at(
        block_height,
        payee_address,
        payee_public_key,
        reward,
        miner_data,
        unix_millis(),
    )
}

/// Same as [`create_coinbase_transaction`] with an explicit creation time (ms)
pub fn create_coinbase_transaction_at(
    block_height: Natural,
    payee_address: &str,
    payee_public_key: &str,
    reward: Amount,
    miner_data: Option<&str>,
    timestamp: Natural,
) -> Result<CoinbaseTransaction> {
    let payload = CoinbaseData {
        block_height,
        miner_data: truncate_to_bytes(miner_data.unwrap_or_default(), MAX_COINBASE_DATA_LENGTH)
            .to_string(),
    };
    let data = serde_json::to_string(&payload)?;

    let tx_out = TxOut {
        address: payee_address.to_string(),
        amount: reward,
        public_key: payee_public_key.to_string(),
    };

    let id = calculate_coinbase_id(block_height, &data, &tx_out, timestamp)?;

    Ok(CoinbaseTransaction {
        id,
        timestamp,
        tx_in: CoinbaseTxIn { block_height, data },
        tx_out,
    })
}

/// Coinbase id: SHA-256 of `height:data:JSON(txOut):timestamp`
fn calculate_coinbase_id(
    block_height: Natural,
    data: &str,
    tx_out: &TxOut,
    timestamp: Natural,
) -> Result<String> {
    let tx_out_json = serde_json::to_string(tx_out)?;
    Ok(sha256_hex(format!(
        "{}:{}:{}:{}",
        block_height, data, tx_out_json, timestamp
    )))
}

pub fn coinbase_block_height(tx: &CoinbaseTransaction) -> Natural {
    tx.tx_in.block_height
}

/// Miner data carried by the coinbase, if its payload decodes
pub fn coinbase_miner_data(tx: &CoinbaseTransaction) -> Option<String> {
    serde_json::from_str::<CoinbaseData>(&tx.tx_in.data)
        .ok()
        .map(|payload| payload.miner_data)
}

/// Longest prefix of `value` that fits in `max` bytes without splitting a char
fn truncate_to_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
