//! Mining and block creation

use log::info;

use crate::coinbase::create_coinbase_transaction;
use crate::config::MiningConfig;
use crate::economic::get_block_reward;
use crate::error::Result;
use crate::hash::BlockPreimage;
use crate::pow::{find_nonce, CancelToken};
use crate::time::unix_seconds;
use crate::types::*;

/// Recipient of a block's coinbase reward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payee {
    pub address: String,
    pub public_key: String,
    /// Free-form miner tag, truncated to 100 bytes in the coinbase
    pub miner_data: Option<String>,
}

impl Payee {
    pub fn new(address: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: public_key.into(),
            miner_data: None,
        }
    }

    pub fn with_miner_data(mut self, miner_data: impl Into<String>) -> Self {
        self.miner_data = Some(miner_data.into());
        self
    }
}

/// Everything hashed into a block except the nonce
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTemplate {
    pub index: Natural,
    pub previous_hash: HashHex,
    pub timestamp: Natural,
    /// Coinbase first, then the caller's transactions in order
    pub transactions: Vec<Transaction>,
    pub difficulty: u32,
}

impl BlockTemplate {
    fn preimage(&self) -> Result<BlockPreimage> {
        BlockPreimage::new(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.difficulty,
        )
    }
}

/// CreateBlockTemplate: ℕ × ℬ × 𝒯𝒳* × ℕ × 𝒫 × ℕ → 𝒯
///
/// 1. Look up the scheduled reward for `index`
/// 2. Build the coinbase paying it to `payee`
/// 3. Prepend the coinbase to `transactions`
pub fn create_block_template(
    index: Natural,
    previous_block: &Block,
    transactions: Vec<Transaction>,
    difficulty: u32,
    payee: &Payee,
    timestamp: Natural,
) -> Result<BlockTemplate> {
    let reward = get_block_reward(index);
    let coinbase = create_coinbase_transaction(
        index,
        &payee.address,
        &payee.public_key,
        reward,
        payee.miner_data.as_deref(),
    )?;

    let mut all_transactions = Vec::with_capacity(transactions.len() + 1);
    all_transactions.push(Transaction::Coinbase(coinbase));
    all_transactions.extend(transactions);

    Ok(BlockTemplate {
        index,
        previous_hash: previous_block.hash.clone(),
        timestamp,
        transactions: all_transactions,
        difficulty,
    })
}

/// Proof-of-work block producer
#[derive(Debug, Clone, Default)]
pub struct Miner {
    config: MiningConfig,
    cancel: CancelToken,
}

impl Miner {
    pub fn new(config: MiningConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancellation signal with the caller
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// MineBlock: ℕ × ℬ × 𝒯𝒳* × ℕ × 𝒫 → ℬ
    ///
    /// Timestamp the block now, prepend the coinbase and search for a nonce.
    pub fn mine_block(
        &self,
        index: Natural,
        previous_block: &Block,
        transactions: Vec<Transaction>,
        difficulty: u32,
        payee: &Payee,
    ) -> Result<Block> {
        let template = create_block_template(
            index,
            previous_block,
            transactions,
            difficulty,
            payee,
            unix_seconds(),
        )?;
        self.mine_template(template)
    }

    /// Search for a nonce over a prepared template and assemble the block.
    ///
    /// A cancellation stops only the search it interrupts: the token is
    /// cleared once the search ends, found or not.
    pub fn mine_template(&self, template: BlockTemplate) -> Result<Block> {
        let preimage = template.preimage()?;
        let outcome = find_nonce(&preimage, &self.config, &self.cancel);
        self.cancel.reset();
        let (nonce, hash) = outcome?;

        info!(
            "Mined block {} with hash {} (nonce: {})",
            template.index, hash, nonce
        );

        Ok(Block {
            index: template.index,
            timestamp: template.timestamp,
            transactions: template.transactions,
            previous_hash: template.previous_hash,
            hash,
            nonce,
            difficulty: template.difficulty,
        })
    }
}

/// Mine with default settings and no cancellation
pub fn mine_block(
    index: Natural,
    previous_block: &Block,
    transactions: Vec<Transaction>,
    difficulty: u32,
    payee: &Payee,
) -> Result<Block> {
    Miner::default().mine_block(index, previous_block, transactions, difficulty, payee)
}
