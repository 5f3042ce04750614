//! Core ledger types
//!
//! Field declaration order is the canonical serialization order consumed by
//! the block hash, so reordering fields changes every block hash.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Rejection;

/// Natural number type
pub type Natural = u64;

/// Coin amount. Rewards halve down to 50 / 2^63, so amounts are fractional.
pub type Amount = f64;

/// Hex-encoded SHA-256 digest (64 chars)
pub type HashHex = String;

/// Reference to a specific output of a prior transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub transaction_output_id: String,
    pub output_index: Natural,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_output_id, self.output_index)
    }
}

/// Transaction input: spends a prior output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    pub transaction_output_id: String,
    pub output_index: Natural,
    pub signature: String,
}

impl TxIn {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            transaction_output_id: self.transaction_output_id.clone(),
            output_index: self.output_index,
        }
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOut {
    pub address: String,
    pub amount: Amount,
    pub public_key: String,
}

/// Value transfer between addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularTransaction {
    pub id: String,
    pub timestamp: Natural,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
}

impl RegularTransaction {
    /// Outpoints consumed by this transaction, in input order
    pub fn outpoints(&self) -> impl Iterator<Item = OutPoint> + '_ {
        self.tx_ins.iter().map(TxIn::outpoint)
    }

    pub fn total_output_amount(&self) -> Amount {
        self.tx_outs.iter().map(|o| o.amount).sum()
    }
}

/// Coinbase input: carries the block height and encoded miner data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinbaseTxIn {
    pub block_height: Natural,
    pub data: String,
}

/// Reward-issuing transaction; only valid as the first transaction of a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinbaseTransaction {
    pub id: String,
    pub timestamp: Natural,
    pub tx_in: CoinbaseTxIn,
    pub tx_out: TxOut,
}

/// Transaction: the `type` tag is the only runtime discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transaction {
    Regular(RegularTransaction),
    Coinbase(CoinbaseTransaction),
}

impl Transaction {
    pub fn id(&self) -> &str {
        match self {
            Transaction::Regular(tx) => &tx.id,
            Transaction::Coinbase(tx) => &tx.id,
        }
    }

    pub fn timestamp(&self) -> Natural {
        match self {
            Transaction::Regular(tx) => tx.timestamp,
            Transaction::Coinbase(tx) => tx.timestamp,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, Transaction::Coinbase(_))
    }

    pub fn as_regular(&self) -> Option<&RegularTransaction> {
        match self {
            Transaction::Regular(tx) => Some(tx),
            Transaction::Coinbase(_) => None,
        }
    }

    pub fn as_coinbase(&self) -> Option<&CoinbaseTransaction> {
        match self {
            Transaction::Coinbase(tx) => Some(tx),
            Transaction::Regular(_) => None,
        }
    }

    /// Outputs created by this transaction, in index order
    pub fn outputs(&self) -> &[TxOut] {
        match self {
            Transaction::Regular(tx) => &tx.tx_outs,
            Transaction::Coinbase(tx) => std::slice::from_ref(&tx.tx_out),
        }
    }
}

impl From<RegularTransaction> for Transaction {
    fn from(tx: RegularTransaction) -> Self {
        Transaction::Regular(tx)
    }
}

impl From<CoinbaseTransaction> for Transaction {
    fn from(tx: CoinbaseTransaction) -> Self {
        Transaction::Coinbase(tx)
    }
}

/// Block: hash-linked to its predecessor through `previous_hash`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: Natural,
    pub timestamp: Natural,
    pub transactions: Vec<Transaction>,
    pub previous_hash: HashHex,
    pub hash: HashHex,
    pub nonce: Natural,
    pub difficulty: u32,
}

/// Claimable output not yet consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    pub transaction_output_id: String,
    pub output_index: Natural,
    pub address: String,
    pub amount: Amount,
    pub public_key: String,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            transaction_output_id: self.transaction_output_id.clone(),
            output_index: self.output_index,
        }
    }
}

/// UTXO Set: at most one entry per outpoint
pub type UtxoSet = HashMap<OutPoint, UnspentOutput>;

/// Validation result
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid(Rejection),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(reason) => Some(reason),
        }
    }
}
