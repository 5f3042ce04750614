//! Pool of validated transactions awaiting inclusion

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::error::{LedgerError, Rejection, Result, SemanticViolation};
use crate::transaction::{check_tx_id_unused, TransactionValidator};
use crate::types::*;

/// Mempool admission result
#[derive(Debug, Clone, PartialEq)]
pub enum MempoolResult {
    Accepted,
    Rejected(Rejection),
}

impl MempoolResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MempoolResult::Accepted)
    }
}

/// Insertion-ordered set of pending regular transactions.
///
/// No two pooled transactions consume the same outpoint; `claims` maps each
/// consumed outpoint to the pooled transaction spending it.
#[derive(Debug, Clone)]
pub struct Mempool {
    validator: TransactionValidator,
    transactions: HashMap<String, RegularTransaction>,
    order: Vec<String>,
    claims: HashMap<OutPoint, String>,
}

impl Mempool {
    pub fn new(validator: TransactionValidator) -> Self {
        Self {
            validator,
            transactions: HashMap::new(),
            order: Vec::new(),
            claims: HashMap::new(),
        }
    }

    /// AcceptToMemoryPool: 𝒯𝒳 × 𝒰𝒮 → {accepted, rejected}
    ///
    /// For transaction tx and UTXO set us:
    /// 1. tx.id is not already pooled and names no unspent output in us
    /// 2. tx is structurally valid
    /// 3. tx is semantically valid against us
    /// 4. no input of tx is claimed by a pooled transaction
    pub fn add(&mut self, tx: Transaction, utxo_set: &UtxoSet) -> Result<MempoolResult> {
        // 1. Duplicate id
        if self.transactions.contains_key(tx.id()) {
            return Ok(self.reject(SemanticViolation::AlreadyPooled(tx.id().to_string()).into()));
        }
        if let ValidationResult::Invalid(rejection) = check_tx_id_unused(&tx, utxo_set) {
            return Ok(self.reject(rejection));
        }

        // 2-3. Structure, then semantics
        let result = self.validator.validate(&tx, utxo_set)?;
        if let ValidationResult::Invalid(rejection) = result {
            return Ok(self.reject(rejection));
        }

        let tx = match tx {
            Transaction::Regular(regular) => regular,
            // validate() never accepts a coinbase
            Transaction::Coinbase(coinbase) => {
                return Err(LedgerError::InvariantViolation(format!(
                    "coinbase {} passed pool validation",
                    coinbase.id
                )))
            }
        };

        // 4. Pool-level double spend
        for outpoint in tx.outpoints() {
            if let Some(claimed_by) = self.claims.get(&outpoint) {
                let violation = SemanticViolation::PoolDoubleSpend {
                    claimed_by: claimed_by.clone(),
                    outpoint,
                };
                return Ok(self.reject(violation.into()));
            }
        }

        for outpoint in tx.outpoints() {
            self.claims.insert(outpoint, tx.id.clone());
        }
        info!("Transaction {} added to the pool", tx.id);
        self.order.push(tx.id.clone());
        self.transactions.insert(tx.id.clone(), tx);

        Ok(MempoolResult::Accepted)
    }

    /// Remove a pooled transaction; false if it was not pooled
    pub fn remove(&mut self, tx_id: &str) -> bool {
        match self.transactions.remove(tx_id) {
            Some(tx) => {
                for outpoint in tx.outpoints() {
                    self.claims.remove(&outpoint);
                }
                self.order.retain(|id| id != tx_id);
                true
            }
            None => false,
        }
    }

    /// Drop pooled transactions made obsolete by an accepted block: those
    /// included in it and those spending an outpoint it consumed.
    ///
    /// Returns the number of transactions removed.
    pub fn reconcile(&mut self, block_transactions: &[Transaction]) -> usize {
        let included: HashSet<&str> = block_transactions.iter().map(Transaction::id).collect();
        let spent: HashSet<OutPoint> = block_transactions
            .iter()
            .filter_map(Transaction::as_regular)
            .flat_map(RegularTransaction::outpoints)
            .collect();

        let stale: Vec<String> = self
            .order
            .iter()
            .filter(|id| {
                included.contains(id.as_str())
                    || self
                        .transactions
                        .get(id.as_str())
                        .map_or(false, |tx| tx.outpoints().any(|o| spent.contains(&o)))
            })
            .cloned()
            .collect();

        for id in &stale {
            debug!("Removing transaction {} from the pool: inputs spent by block", id);
            self.remove(id);
        }
        stale.len()
    }

    pub fn get(&self, tx_id: &str) -> Option<&RegularTransaction> {
        self.transactions.get(tx_id)
    }

    /// Pooled transactions in insertion order
    pub fn list(&self) -> Vec<RegularTransaction> {
        self.order
            .iter()
            .filter_map(|id| self.transactions.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, tx_id: &str) -> bool {
        self.transactions.contains_key(tx_id)
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.order.clear();
        self.claims.clear();
    }

    /// Outpoints consumed by pooled transactions
    pub fn claimed_outpoints(&self) -> impl Iterator<Item = &OutPoint> {
        self.claims.keys()
    }

    fn reject(&self, rejection: Rejection) -> MempoolResult {
        warn!("Pool admission rejected: {}", rejection);
        MempoolResult::Rejected(rejection)
    }
}
