//! Authoritative block sequence

use log::info;
use std::collections::HashSet;

use crate::block::validate_chain;
use crate::error::{LedgerError, Result};
use crate::genesis::genesis_block;
use crate::types::*;

/// Ordered sequence of blocks, always starting with the canonical genesis
/// block and valid as a whole.
///
/// Blocks are appended only through [`crate::Ledger::add_block`], which keeps
/// the UTXO set and mempool in step with the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    blocks: Vec<Block>,
    /// Ids of every confirmed transaction
    transaction_ids: HashSet<String>,
}

impl Chain {
    /// A chain holding only the genesis block
    pub fn new() -> Result<Self> {
        Ok(Self::with_blocks(vec![genesis_block()?]))
    }

    /// Adopt an existing block sequence after full validation
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        match validate_chain(&blocks)? {
            ValidationResult::Valid => Ok(Self::with_blocks(blocks)),
            ValidationResult::Invalid(rejection) => Err(LedgerError::InvariantViolation(format!(
                "cannot adopt invalid chain: {}",
                rejection
            ))),
        }
    }

    fn with_blocks(blocks: Vec<Block>) -> Self {
        let transaction_ids = blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .map(|tx| tx.id().to_string())
            .collect();
        Self {
            blocks,
            transaction_ids,
        }
    }

    /// The tip; a chain is never empty
    pub fn latest_block(&self) -> Result<&Block> {
        self.blocks
            .last()
            .ok_or_else(|| LedgerError::InvariantViolation("chain has no blocks".to_string()))
    }

    /// Append a block already validated against the current tip
    pub(crate) fn push_validated(&mut self, block: Block) {
        info!("Block #{} added to the chain", block.index);
        self.transaction_ids
            .extend(block.transactions.iter().map(|tx| tx.id().to_string()));
        self.blocks.push(block);
    }

    /// True if a transaction with this id is confirmed in some block
    pub fn contains_transaction(&self, tx_id: &str) -> bool {
        self.transaction_ids.contains(tx_id)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Owned copy; later appends do not affect it
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Re-validate the whole chain from genesis
    pub fn validate(&self) -> Result<ValidationResult> {
        validate_chain(&self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::validate_new_block;
    use crate::mining::{create_block_template, Miner, Payee};

    fn next_block(chain: &Chain, offset: Natural) -> Block {
        let tip = chain.latest_block().unwrap();
        let template = create_block_template(
            tip.index + 1,
            tip,
            vec![],
            4,
            &Payee::new("miner", "miner-pk"),
            tip.timestamp + offset,
        )
        .unwrap();
        Miner::default().mine_template(template).unwrap()
    }

    fn extend(chain: &mut Chain) -> Block {
        let block = next_block(chain, 1);
        assert!(validate_new_block(&block, chain.latest_block().unwrap()).unwrap().is_valid());
        chain.push_validated(block.clone());
        block
    }

    #[test]
    fn test_new_chain_holds_genesis() {
        let chain = Chain::new().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.latest_block().unwrap(), &genesis_block().unwrap());
        assert!(chain.validate().unwrap().is_valid());
    }

    #[test]
    fn test_push_validated_moves_tip() {
        let mut chain = Chain::new().unwrap();
        let block = extend(&mut chain);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest_block().unwrap(), &block);
        assert!(chain.validate().unwrap().is_valid());
    }

    #[test]
    fn test_confirmed_transactions_are_indexed() {
        let mut chain = Chain::new().unwrap();
        let block = extend(&mut chain);
        let coinbase_id = block.transactions[0].id();

        assert!(chain.contains_transaction(coinbase_id));
        assert!(!chain.contains_transaction("unknown"));
        assert!(Chain::from_blocks(chain.snapshot()).unwrap().contains_transaction(coinbase_id));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut chain = Chain::new().unwrap();
        let snapshot = chain.snapshot();
        extend(&mut chain);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_from_blocks() {
        let mut chain = Chain::new().unwrap();
        extend(&mut chain);

        let adopted = Chain::from_blocks(chain.snapshot()).unwrap();
        assert_eq!(adopted, chain);

        assert!(Chain::from_blocks(vec![]).is_err());
        let mut reversed = chain.snapshot();
        reversed.reverse();
        assert!(Chain::from_blocks(reversed).is_err());
    }
}
