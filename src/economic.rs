//! Reward schedule

use crate::constants::*;
use crate::types::*;

/// GetBlockReward: ℕ → ℝ≥0
///
/// Calculate the coinbase reward for a given height.
/// Reward halves every 210,000 blocks (HALVING_INTERVAL).
///
/// Formula: reward = 50 * 2^(-⌊h/H⌋) for h ≥ 1
/// Where:
/// - h = block height
/// - H = HALVING_INTERVAL (210,000)
///
/// The genesis block pays nothing, and from the 64th halving on the reward is
/// exactly zero.
pub fn get_block_reward(height: Natural) -> Amount {
    if height == GENESIS_INDEX {
        return 0.0;
    }

    let halvings = height / HALVING_INTERVAL;
    if halvings >= MAX_HALVINGS {
        return 0.0;
    }

    // Division by a power of two is exact in binary floating point
    INITIAL_REWARD / 2f64.powi(halvings as i32)
}

/// TotalSupply: ℕ → ℝ≥0
///
/// Sum of all block rewards for heights 1..=height, accumulated per
/// halving epoch rather than per block.
pub fn total_supply(height: Natural) -> Amount {
    let mut total = 0.0;
    let last_epoch = (height / HALVING_INTERVAL).min(MAX_HALVINGS - 1);

    for epoch in 0..=last_epoch {
        let first = (epoch * HALVING_INTERVAL).max(1);
        let last = ((epoch + 1) * HALVING_INTERVAL - 1).min(height);
        if last < first {
            continue;
        }
        let blocks = (last - first + 1) as f64;
        total += blocks * get_block_reward(first);
    }

    total
}
