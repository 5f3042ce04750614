//! Block and chain validation
//!
//! Every check here is a pure predicate over its arguments. A block that fails
//! any check is rejected whole.

use log::debug;

use crate::coinbase::coinbase_miner_data;
use crate::constants::{GENESIS_INDEX, MAX_COINBASE_DATA_LENGTH, MAX_COINBASE_PAYLOAD_LENGTH};
use crate::economic::get_block_reward;
use crate::error::{ConsensusViolation, Rejection, Result};
use crate::genesis::is_genesis_block;
use crate::hash::{hash_for_block, is_hash_hex};
use crate::pow::hash_matches_difficulty;
use crate::types::*;

/// ValidateNewBlock: ℬ × ℬ → {valid, invalid}
///
/// For candidate b and its predecessor p:
/// 1. b is well-formed
/// 2. b.index = p.index + 1
/// 3. b.previousHash = p.hash
/// 4. b.timestamp > p.timestamp
/// 5. b.hash = Hash(b)
/// 6. b.hash has at least b.difficulty leading zero bits
/// 7. b carries exactly one coinbase, first, paying Reward(b.index) at height b.index
pub fn validate_new_block(new_block: &Block, previous_block: &Block) -> Result<ValidationResult> {
    // 1. Structure
    let structure = check_block_structure(new_block);
    if !structure.is_valid() {
        return Ok(structure);
    }

    // 2. Position
    let expected_index = previous_block.index.saturating_add(1);
    if new_block.index != expected_index {
        return Ok(reject(ConsensusViolation::IndexMismatch {
            expected: expected_index,
            actual: new_block.index,
        }));
    }

    // 3. Linkage
    if new_block.previous_hash != previous_block.hash {
        return Ok(reject(ConsensusViolation::PreviousHashMismatch {
            expected: previous_block.hash.clone(),
            actual: new_block.previous_hash.clone(),
        }));
    }

    // 4. Strictly increasing timestamp; no future-tolerance window
    if new_block.timestamp <= previous_block.timestamp {
        return Ok(reject(ConsensusViolation::TimestampNotIncreasing {
            previous: previous_block.timestamp,
            actual: new_block.timestamp,
        }));
    }

    // 5. Hash integrity
    let computed = hash_for_block(new_block)?;
    if computed != new_block.hash {
        return Ok(reject(ConsensusViolation::HashMismatch {
            declared: new_block.hash.clone(),
            computed,
        }));
    }

    // 6. Proof of work
    if !hash_matches_difficulty(&new_block.hash, new_block.difficulty) {
        return Ok(reject(ConsensusViolation::InsufficientWork {
            hash: new_block.hash.clone(),
            difficulty: new_block.difficulty,
        }));
    }

    // 7. Coinbase
    if new_block.index != GENESIS_INDEX {
        let coinbase = check_coinbase(new_block);
        if !coinbase.is_valid() {
            return Ok(coinbase);
        }
    }

    Ok(ValidationResult::Valid)
}

/// Well-formedness: both hashes are 64 hex chars
pub fn check_block_structure(block: &Block) -> ValidationResult {
    if !is_hash_hex(&block.hash) {
        return structural(format!("block {} hash is not a 64-char hex digest", block.index));
    }
    if !is_hash_hex(&block.previous_hash) {
        return structural(format!(
            "block {} previous hash is not a 64-char hex digest",
            block.index
        ));
    }
    ValidationResult::Valid
}

/// CheckCoinbase: ℬ → {valid, invalid}
///
/// 1. txs[0] is a coinbase with blockHeight = b.index
/// 2. |txs[0].data| ≤ MAX_COINBASE_PAYLOAD_LENGTH and its miner data, when
///    decodable, is at most MAX_COINBASE_DATA_LENGTH bytes
/// 3. txs[0] pays exactly Reward(b.index)
/// 4. no other transaction is a coinbase
pub fn check_coinbase(block: &Block) -> ValidationResult {
    let coinbase = match block.transactions.first() {
        Some(Transaction::Coinbase(coinbase)) => coinbase,
        _ => return reject(ConsensusViolation::MissingCoinbase),
    };

    if coinbase.tx_in.block_height != block.index {
        return reject(ConsensusViolation::CoinbaseHeightMismatch {
            expected: block.index,
            actual: coinbase.tx_in.block_height,
        });
    }

    let length = coinbase.tx_in.data.len();
    if length > MAX_COINBASE_PAYLOAD_LENGTH {
        return reject(ConsensusViolation::CoinbaseDataTooLong {
            length,
            max: MAX_COINBASE_PAYLOAD_LENGTH,
        });
    }
    if let Some(miner_data) = coinbase_miner_data(coinbase) {
        if miner_data.len() > MAX_COINBASE_DATA_LENGTH {
            return reject(ConsensusViolation::CoinbaseDataTooLong {
                length: miner_data.len(),
                max: MAX_COINBASE_DATA_LENGTH,
            });
        }
    }

    let reward = get_block_reward(block.index);
    if coinbase.tx_out.amount != reward {
        return reject(ConsensusViolation::CoinbaseRewardMismatch {
            expected: reward,
            actual: coinbase.tx_out.amount,
        });
    }

    if let Some(position) = block
        .transactions
        .iter()
        .skip(1)
        .position(Transaction::is_coinbase)
    {
        return reject(ConsensusViolation::MisplacedCoinbase {
            position: position + 1,
        });
    }

    ValidationResult::Valid
}

/// ValidateChain: ℬ* → {valid, invalid}
///
/// A chain is valid iff it is non-empty, starts with the canonical genesis
/// block, and every later block is a valid successor of the block before it.
/// Stops at the first failure.
pub fn validate_chain(chain: &[Block]) -> Result<ValidationResult> {
    let genesis = match chain.first() {
        Some(genesis) => genesis,
        None => return Ok(reject(ConsensusViolation::EmptyChain)),
    };

    if !is_genesis_block(genesis)? {
        return Ok(reject(ConsensusViolation::InvalidGenesis));
    }

    for pair in chain.windows(2) {
        let result = validate_new_block(&pair[1], &pair[0])?;
        if !result.is_valid() {
            debug!("Invalid block at index {}", pair[1].index);
            return Ok(result);
        }
    }

    Ok(ValidationResult::Valid)
}

fn reject(violation: ConsensusViolation) -> ValidationResult {
    debug!("Block rejected: {}", violation);
    ValidationResult::Invalid(Rejection::Consensus(violation))
}

fn structural(reason: String) -> ValidationResult {
    debug!("Block rejected: {}", reason);
    ValidationResult::Invalid(Rejection::Structural(reason))
}
