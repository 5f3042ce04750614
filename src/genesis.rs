//! Canonical genesis block

use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::hash::calculate_block_hash;
use crate::types::*;

/// The fixed first block shared by every chain
pub fn genesis_block() -> Result<Block> {
    let transactions = Vec::new();
    let hash = calculate_block_hash(
        GENESIS_INDEX,
        GENESIS_PREVIOUS_HASH,
        GENESIS_TIMESTAMP,
        &transactions,
        GENESIS_NONCE,
        GENESIS_DIFFICULTY,
    )
    .map_err(|e| LedgerError::InvariantViolation(format!("genesis block cannot be hashed: {}", e)))?;

    Ok(Block {
        index: GENESIS_INDEX,
        timestamp: GENESIS_TIMESTAMP,
        transactions,
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        hash,
        nonce: GENESIS_NONCE,
        difficulty: GENESIS_DIFFICULTY,
    })
}

/// Whether `block` is bit-for-bit the canonical genesis block
pub fn is_genesis_block(block: &Block) -> Result<bool> {
    Ok(*block == genesis_block()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_for_block;

    #[test]
    fn test_genesis_is_stable() {
        assert_eq!(genesis_block().unwrap(), genesis_block().unwrap());
    }

    #[test]
    fn test_genesis_fields() {
        let genesis = genesis_block().unwrap();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0".repeat(64));
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.difficulty, 1);
        assert_eq!(hash_for_block(&genesis).unwrap(), genesis.hash);
    }

    #[test]
    fn test_modified_genesis_is_not_canonical() {
        let mut genesis = genesis_block().unwrap();
        assert!(is_genesis_block(&genesis).unwrap());
        genesis.timestamp += 1;
        assert!(!is_genesis_block(&genesis).unwrap());
    }
}
