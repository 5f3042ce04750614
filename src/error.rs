//! Error types for ledger validation

use thiserror::Error;

use crate::types::{Amount, HashHex, Natural, OutPoint};

/// Why a block or transaction was turned away.
///
/// Rejections are ordinary values: the caller decides whether to retry or
/// discard, and nothing was applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusViolation),

    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticViolation),
}

/// Block-level rule violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusViolation {
    #[error("expected index {expected}, found {actual}")]
    IndexMismatch { expected: Natural, actual: Natural },

    #[error("previous hash {actual} does not match tip hash {expected}")]
    PreviousHashMismatch { expected: HashHex, actual: HashHex },

    #[error("timestamp {actual} is not after previous timestamp {previous}")]
    TimestampNotIncreasing { previous: Natural, actual: Natural },

    #[error("declared hash {declared} does not match computed hash {computed}")]
    HashMismatch { declared: HashHex, computed: HashHex },

    #[error("hash {hash} does not satisfy difficulty {difficulty}")]
    InsufficientWork { hash: HashHex, difficulty: u32 },

    #[error("first transaction is not a coinbase")]
    MissingCoinbase,

    #[error("coinbase height {actual} does not match block index {expected}")]
    CoinbaseHeightMismatch { expected: Natural, actual: Natural },

    #[error("coinbase pays {actual}, scheduled reward is {expected}")]
    CoinbaseRewardMismatch { expected: Amount, actual: Amount },

    #[error("coinbase data is {length} bytes, limit is {max}")]
    CoinbaseDataTooLong { length: usize, max: usize },

    #[error("coinbase transaction at position {position}")]
    MisplacedCoinbase { position: usize },

    #[error("chain is empty")]
    EmptyChain,

    #[error("first block is not the canonical genesis block")]
    InvalidGenesis,
}

/// Transaction-level rule violations against a UTXO set or the mempool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticViolation {
    #[error("referenced output {0} does not exist or is already spent")]
    UnknownOutput(OutPoint),

    #[error("output {0} is spent twice within the transaction")]
    DuplicateInput(OutPoint),

    #[error("invalid signature on input {input} spending {outpoint}")]
    InvalidSignature { input: usize, outpoint: OutPoint },

    #[error("inputs total {inputs} but outputs total {outputs}")]
    InsufficientFunds { inputs: Amount, outputs: Amount },

    #[error("output {outpoint} is already claimed by pooled transaction {claimed_by}")]
    PoolDoubleSpend { outpoint: OutPoint, claimed_by: String },

    #[error("transaction {0} is already pooled")]
    AlreadyPooled(String),

    #[error("transaction id {0} is already in use")]
    DuplicateTransactionId(String),
}

/// Failures that are not a verdict on the input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: Natural },

    #[error("Nonce space exhausted")]
    NonceSpaceExhausted,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
