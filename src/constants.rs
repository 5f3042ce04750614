//! Ledger consensus constants

use crate::types::{Amount, Natural};

/// Reward paid by the first block of every chain: 50 coins
pub const INITIAL_REWARD: Amount = 50.0;

/// Halving interval: 210,000 blocks
pub const HALVING_INTERVAL: Natural = 210_000;

/// After this many halvings the reward is exactly zero
pub const MAX_HALVINGS: Natural = 64;

/// Maximum miner-supplied coinbase data, in bytes
pub const MAX_COINBASE_DATA_LENGTH: usize = 100;

/// Maximum encoded coinbase payload, in bytes: the JSON envelope around a
/// 20-digit height (51 bytes) plus miner data in which every byte needs a
/// six-byte `\u00XX` escape
pub const MAX_COINBASE_PAYLOAD_LENGTH: usize = 51 + 6 * MAX_COINBASE_DATA_LENGTH;

/// Length of a hex-encoded SHA-256 digest
pub const HASH_HEX_LENGTH: usize = 64;

/// Genesis block index
pub const GENESIS_INDEX: Natural = 0;

/// Genesis block timestamp (2024-01-01T00:00:00Z)
pub const GENESIS_TIMESTAMP: Natural = 1_704_067_200;

/// Genesis block nonce
pub const GENESIS_NONCE: Natural = 0;

/// Genesis block difficulty
pub const GENESIS_DIFFICULTY: u32 = 1;

/// Previous hash recorded in the genesis block: 64 zeros
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
