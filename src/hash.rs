//! Block hashing
//!
//! The block hash is SHA-256 over
//! `index ‖ previousHash ‖ timestamp ‖ JSON(transactions) ‖ nonce ‖ difficulty`,
//! rendered as lowercase hex. Transactions serialize in field-declaration
//! order, so equal transaction lists always hash identically.

use sha2::{Digest, Sha256};

use crate::constants::HASH_HEX_LENGTH;
use crate::error::Result;
use crate::types::*;

/// Hash state over everything that precedes the nonce.
///
/// Mining varies only the nonce, so the serialized transactions are hashed
/// once and the midstate is cloned per attempt.
#[derive(Clone)]
pub struct BlockPreimage {
    prefix: Sha256,
    difficulty: u32,
}

impl BlockPreimage {
    pub fn new(
        index: Natural,
        previous_hash: &str,
        timestamp: Natural,
        transactions: &[Transaction],
        difficulty: u32,
    ) -> Result<Self> {
        let transactions_json = serde_json::to_string(transactions)?;

        let mut prefix = Sha256::new();
        prefix.update(index.to_string().as_bytes());
        prefix.update(previous_hash.as_bytes());
        prefix.update(timestamp.to_string().as_bytes());
        prefix.update(transactions_json.as_bytes());

        Ok(Self { prefix, difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Hash of the block with this nonce filled in
    pub fn hash_with_nonce(&self, nonce: Natural) -> HashHex {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_string().as_bytes());
        hasher.update(self.difficulty.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// CalculateBlockHash: ℕ × ℍ × ℕ × 𝒯𝒳* × ℕ × ℕ → ℍ
pub fn calculate_block_hash(
    index: Natural,
    previous_hash: &str,
    timestamp: Natural,
    transactions: &[Transaction],
    nonce: Natural,
    difficulty: u32,
) -> Result<HashHex> {
    let preimage = BlockPreimage::new(index, previous_hash, timestamp, transactions, difficulty)?;
    Ok(preimage.hash_with_nonce(nonce))
}

/// Recompute the hash of a block from its declared fields
pub fn hash_for_block(block: &Block) -> Result<HashHex> {
    calculate_block_hash(
        block.index,
        &block.previous_hash,
        block.timestamp,
        &block.transactions,
        block.nonce,
        block.difficulty,
    )
}

/// Lowercase hex SHA-256 of arbitrary bytes
pub fn sha256_hex(data: impl AsRef<[u8]>) -> HashHex {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Whether `value` looks like a hex-encoded SHA-256 digest
pub fn is_hash_hex(value: &str) -> bool {
    value.len() == HASH_HEX_LENGTH && value.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase(height: Natural) -> Transaction {
        Transaction::Coinbase(CoinbaseTransaction {
            id: format!("cb-{}", height),
            timestamp: 1_704_067_200_000,
            tx_in: CoinbaseTxIn { block_height: height, data: String::new() },
            tx_out: TxOut {
                address: "miner".to_string(),
                amount: 50.0,
                public_key: "pk".to_string(),
            },
        })
    }

    fn base_hash() -> HashHex {
        calculate_block_hash(1, &"0".repeat(64), 100, &[coinbase(1)], 7, 3).unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(base_hash(), base_hash());
        assert!(is_hash_hex(&base_hash()));
    }

    #[test]
    fn test_every_field_changes_hash() {
        let prev = "0".repeat(64);
        let txs = [coinbase(1)];
        let base = base_hash();

        assert_ne!(base, calculate_block_hash(2, &prev, 100, &txs, 7, 3).unwrap());
        assert_ne!(base, calculate_block_hash(1, &"1".repeat(64), 100, &txs, 7, 3).unwrap());
        assert_ne!(base, calculate_block_hash(1, &prev, 101, &txs, 7, 3).unwrap());
        assert_ne!(base, calculate_block_hash(1, &prev, 100, &[coinbase(2)], 7, 3).unwrap());
        assert_ne!(base, calculate_block_hash(1, &prev, 100, &txs, 8, 3).unwrap());
        assert_ne!(base, calculate_block_hash(1, &prev, 100, &txs, 7, 4).unwrap());
    }

    #[test]
    fn test_preimage_matches_one_shot_hash() {
        let preimage = BlockPreimage::new(1, &"0".repeat(64), 100, &[coinbase(1)], 3).unwrap();
        assert_eq!(preimage.hash_with_nonce(7), base_hash());
        assert_eq!(preimage.difficulty(), 3);
    }

    #[test]
    fn test_preimage_concatenation_order() {
        // index ‖ previousHash ‖ timestamp ‖ "[]" ‖ nonce ‖ difficulty
        let expected = sha256_hex("5abc10[]421");
        assert_eq!(calculate_block_hash(5, "abc", 10, &[], 42, 1).unwrap(), expected);
    }

    #[test]
    fn test_is_hash_hex() {
        assert!(is_hash_hex(&"ab".repeat(32)));
        assert!(!is_hash_hex("abc"));
        assert!(!is_hash_hex(&"zz".repeat(32)));
    }
}
