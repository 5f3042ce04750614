//! # pow-ledger
//!
//! A single-node proof-of-work ledger over a UTXO value model.
//!
//! Blocks are hash-linked, mined to a leading-zero-bit difficulty and carry a
//! coinbase paying a halving reward. Regular transactions spend unspent outputs
//! under signatures checked by an injected [`SignatureVerifier`].
//!
//! ## Architecture
//!
//! - Entities and hashing: [`types`], [`hash`]
//! - Reward schedule and coinbase: [`economic`], [`coinbase`]
//! - Mining: [`pow`], [`mining`]
//! - Validation: [`block`], [`transaction`], [`utxo`]
//! - State: [`chain`], [`mempool`], tied together by [`Ledger`]
//!
//! ## Design Principles
//!
//! 1. **Pure validators**: every rule check is a function of its arguments and
//!    returns [`ValidationResult`]; rejections are values, not errors
//! 2. **Single acceptance point**: [`Ledger::add_block`] validates against the
//!    tip at acceptance time and applies chain, UTXO set and mempool together
//! 3. **Exact version pinning** for the hashing and signature crates
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use pow_ledger::{Ledger, LedgerConfig, Payee, Secp256k1Verifier};
//!
//! let mut ledger = Ledger::new(LedgerConfig::default(), Arc::new(Secp256k1Verifier::new()))?;
//! let payee = Payee::new("miner-address", "miner-public-key");
//!
//! let timestamp = ledger.latest_block()?.timestamp + 1;
//! let block = ledger.mine_block_at(vec![], 4, &payee, timestamp)?;
//! assert!(ledger.add_block(block)?.is_valid());
//! assert_eq!(ledger.balance_of("miner-address"), 50.0);
//! # Ok::<(), pow_ledger::LedgerError>(())
//! ```

pub mod types;
pub mod constants;
pub mod config;
pub mod error;
pub mod hash;
pub mod economic;
pub mod coinbase;
pub mod pow;
pub mod mining;
pub mod genesis;
pub mod block;
pub mod verification;
pub mod transaction;
pub mod utxo;
pub mod mempool;
pub mod chain;
pub mod time;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use config::{LedgerConfig, MiningConfig};
pub use error::{ConsensusViolation, LedgerError, Rejection, Result, SemanticViolation};
pub use chain::Chain;
pub use mempool::{Mempool, MempoolResult};
pub use mining::{BlockTemplate, Miner, Payee};
pub use pow::CancelToken;
pub use transaction::TransactionValidator;
pub use verification::{Secp256k1Verifier, SignatureVerifier};

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Ledger state: chain, UTXO set and mempool under one writer.
///
/// Validators only ever see snapshots; the UTXO set is replaced wholesale when
/// a block is accepted.
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    chain: Chain,
    utxo_set: UtxoSet,
    mempool: Mempool,
    validator: TransactionValidator,
    miner: Miner,
}

impl Ledger {
    /// Start a ledger at the genesis block
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use pow_ledger::{Ledger, LedgerConfig, Secp256k1Verifier};
    ///
    /// let ledger = Ledger::new(LedgerConfig::default(), Arc::new(Secp256k1Verifier::new())).unwrap();
    /// assert_eq!(ledger.chain().len(), 1);
    /// assert!(ledger.utxo_set().is_empty());
    /// ```
    pub fn new(config: LedgerConfig, verifier: Arc<dyn SignatureVerifier>) -> Result<Self> {
        config.mining.validate()?;
        let validator = TransactionValidator::new(verifier);
        Ok(Self {
            miner: Miner::new(config.mining.clone()),
            mempool: Mempool::new(validator.clone()),
            chain: Chain::new()?,
            utxo_set: UtxoSet::new(),
            validator,
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn latest_block(&self) -> Result<&Block> {
        self.chain.latest_block()
    }

    /// Owned copy of the chain
    pub fn chain_snapshot(&self) -> Vec<Block> {
        self.chain.snapshot()
    }

    /// Owned copy of the UTXO set
    pub fn utxo_snapshot(&self) -> UtxoSet {
        self.utxo_set.clone()
    }

    pub fn balance_of(&self, address: &str) -> Amount {
        utxo::balance_of(&self.utxo_set, address)
    }

    pub fn unspent_outputs_for(&self, address: &str) -> Vec<UnspentOutput> {
        utxo::unspent_outputs_for(&self.utxo_set, address)
    }

    /// Signal that abandons the in-flight search (or timestamp wait) started
    /// by this ledger; later searches are unaffected
    pub fn cancel_token(&self) -> CancelToken {
        self.miner.cancel_token().clone()
    }

    /// Accept a candidate block
    ///
    /// 1. Consensus checks against the current tip
    /// 2. No transaction id is already confirmed
    /// 3. Every transaction against the evolving UTXO set
    /// 4. Append, swap in the new UTXO set, drop obsolete pool entries
    ///
    /// A rejected block leaves chain, UTXO set and mempool untouched.
    pub fn add_block(&mut self, block: Block) -> Result<ValidationResult> {
        let consensus = block::validate_new_block(&block, self.chain.latest_block()?)?;
        if let ValidationResult::Invalid(rejection) = &consensus {
            warn!("Block #{} rejected: {}", block.index, rejection);
            return Ok(consensus);
        }

        let confirmed = block
            .transactions
            .iter()
            .find(|tx| self.chain.contains_transaction(tx.id()));
        if let Some(tx) = confirmed {
            let rejection = Rejection::from(SemanticViolation::DuplicateTransactionId(tx.id().to_string()));
            warn!("Block #{} rejected: {}", block.index, rejection);
            return Ok(ValidationResult::Invalid(rejection));
        }

        let (result, utxo_set) = utxo::connect_block(&block, self.utxo_set.clone(), &self.validator)?;
        if let ValidationResult::Invalid(rejection) = &result {
            warn!("Block #{} rejected: {}", block.index, rejection);
            return Ok(result);
        }

        let removed = self.mempool.reconcile(&block.transactions);
        if removed > 0 {
            debug!("Block #{} cleared {} pooled transactions", block.index, removed);
        }
        self.utxo_set = utxo_set;
        self.chain.push_validated(block);

        Ok(ValidationResult::Valid)
    }

    /// Validate a transaction against the current UTXO set and pool it
    pub fn submit_transaction(&mut self, tx: impl Into<Transaction>) -> Result<MempoolResult> {
        let tx = tx.into();
        if self.chain.contains_transaction(tx.id()) {
            let rejection = Rejection::from(SemanticViolation::DuplicateTransactionId(tx.id().to_string()));
            warn!("Pool admission rejected: {}", rejection);
            return Ok(MempoolResult::Rejected(rejection));
        }
        self.mempool.add(tx, &self.utxo_set)
    }

    /// Withdraw a pooled transaction, releasing the outputs it claimed
    pub fn remove_transaction(&mut self, tx_id: &str) -> bool {
        self.mempool.remove(tx_id)
    }

    /// Mine on top of the current tip, stamped with the current time. The
    /// block is returned, not appended.
    pub fn mine_block(&self, transactions: Vec<Transaction>, difficulty: u32, payee: &Payee) -> Result<Block> {
        self.mine_block_at(transactions, difficulty, payee, time::unix_seconds())
    }

    /// Mine on top of the current tip with an explicit timestamp
    pub fn mine_block_at(
        &self,
        transactions: Vec<Transaction>,
        difficulty: u32,
        payee: &Payee,
        timestamp: Natural,
    ) -> Result<Block> {
        let tip = self.chain.latest_block()?;
        let template =
            mining::create_block_template(tip.index + 1, tip, transactions, difficulty, payee, timestamp)?;
        self.miner.mine_template(template)
    }

    /// Mine a block over `transactions` and submit it through [`Ledger::add_block`]
    ///
    /// With `wait_for_fresh_timestamp`, first waits (at most
    /// `max_timestamp_wait_secs`) for the clock to pass the tip timestamp.
    pub fn mine_and_append(
        &mut self,
        transactions: Vec<Transaction>,
        difficulty: u32,
        payee: &Payee,
    ) -> Result<ValidationResult> {
        if self.config.mining.wait_for_fresh_timestamp {
            let tip_timestamp = self.chain.latest_block()?.timestamp;
            let max_wait = Duration::from_secs(self.config.mining.max_timestamp_wait_secs);
            let cancel = self.miner.cancel_token();
            if let Err(err) = time::wait_until_after(tip_timestamp, max_wait, cancel) {
                cancel.reset();
                return Err(err);
            }
        }
        let block = self.mine_block(transactions, difficulty, payee)?;
        self.add_block(block)
    }

    /// Mine every pooled transaction at the configured difficulty
    pub fn mine_pending(&mut self, payee: &Payee) -> Result<ValidationResult> {
        let transactions = self.mempool.list().into_iter().map(Transaction::Regular).collect();
        let difficulty = self.config.default_difficulty;
        self.mine_and_append(transactions, difficulty, payee)
    }

    /// Re-validate the whole chain from genesis
    pub fn validate_chain(&self) -> Result<ValidationResult> {
        self.chain.validate()
    }
}
