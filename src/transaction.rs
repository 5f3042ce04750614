//! Transaction validation against a UTXO set

use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Rejection, Result, SemanticViolation};
use crate::hash::sha256_hex;
use crate::types::*;
use crate::verification::SignatureVerifier;

/// CheckTransaction: 𝒯𝒳 → {valid, invalid}
///
/// A regular transaction tx is well-formed iff:
/// 1. tx.id ≠ "" ∧ tx.timestamp > 0
/// 2. ∀i ∈ ins: i.transactionOutputId ≠ "" ∧ i.signature ≠ ""
/// 3. ∀o ∈ outs: o.address ≠ "" ∧ o.amount is finite ∧ o.amount > 0
///
/// Empty input and output lists are well-formed.
pub fn check_transaction(tx: &RegularTransaction) -> Result<ValidationResult> {
    // 1. Identity
    if tx.id.is_empty() {
        return Ok(structural("transaction id is empty".to_string()));
    }
    if tx.timestamp == 0 {
        return Ok(structural(format!("transaction {} has no timestamp", tx.id)));
    }

    // 2. Inputs
    for (i, input) in tx.tx_ins.iter().enumerate() {
        if input.transaction_output_id.is_empty() {
            return Ok(structural(format!(
                "input {} of {} references an empty output id",
                i, tx.id
            )));
        }
        if input.signature.is_empty() {
            return Ok(structural(format!("input {} of {} is unsigned", i, tx.id)));
        }
    }

    // 3. Outputs
    for (i, output) in tx.tx_outs.iter().enumerate() {
        if output.address.is_empty() {
            return Ok(structural(format!("output {} of {} has no address", i, tx.id)));
        }
        if !output.amount.is_finite() || output.amount <= 0.0 {
            return Ok(structural(format!(
                "invalid output amount {} at index {} of {}",
                output.amount, i, tx.id
            )));
        }
    }

    Ok(ValidationResult::Valid)
}

/// CheckTxInputs: 𝒯𝒳 × 𝒰𝒮 × 𝒱 → {valid, invalid}
///
/// For transaction tx, UTXO set us and verifier V:
/// 1. ∀i ∈ ins: (i.transactionOutputId, i.outputIndex) ∈ us
/// 2. no outpoint is referenced twice by ins
/// 3. ∀i ∈ ins: V(tx.id, i.transactionOutputId, i.outputIndex, u.amount, i.signature, u.publicKey)
/// 4. Σ us(i).amount ≥ Σ o.amount
pub fn check_tx_inputs(
    tx: &RegularTransaction,
    utxo_set: &UtxoSet,
    verifier: &dyn SignatureVerifier,
) -> Result<ValidationResult> {
    let mut seen = HashSet::with_capacity(tx.tx_ins.len());
    let mut total_input_amount: Amount = 0.0;

    for (i, input) in tx.tx_ins.iter().enumerate() {
        let outpoint = input.outpoint();

        // 1. Referenced output exists and is unspent
        let utxo = match utxo_set.get(&outpoint) {
            Some(utxo) => utxo,
            None => return Ok(semantic(SemanticViolation::UnknownOutput(outpoint))),
        };

        // 2. No intra-transaction double spend
        if !seen.insert(outpoint.clone()) {
            return Ok(semantic(SemanticViolation::DuplicateInput(outpoint)));
        }

        // 3. Owner authorized the spend
        if !verifier.verify(
            &tx.id,
            &input.transaction_output_id,
            input.output_index,
            utxo.amount,
            &input.signature,
            &utxo.public_key,
        ) {
            return Ok(semantic(SemanticViolation::InvalidSignature { input: i, outpoint }));
        }

        total_input_amount += utxo.amount;
    }

    // 4. Value conservation; any surplus is burned
    let total_output_amount = tx.total_output_amount();
    if total_input_amount < total_output_amount {
        return Ok(semantic(SemanticViolation::InsufficientFunds {
            inputs: total_input_amount,
            outputs: total_output_amount,
        }));
    }

    Ok(ValidationResult::Valid)
}

/// CheckTxIdUnused: 𝒯𝒳 × 𝒰𝒮 → {valid, invalid}
///
/// tx.id names no unspent output in us. Outputs are keyed by (tx.id, k), so
/// a reused id would overwrite outputs another owner has not spent.
pub fn check_tx_id_unused(tx: &Transaction, utxo_set: &UtxoSet) -> ValidationResult {
    let id = tx.id();
    if utxo_set.keys().any(|outpoint| outpoint.transaction_output_id == id) {
        return semantic(SemanticViolation::DuplicateTransactionId(id.to_string()));
    }
    ValidationResult::Valid
}

/// Transaction validator bound to a signature verification capability
#[derive(Clone)]
pub struct TransactionValidator {
    verifier: Arc<dyn SignatureVerifier>,
}

impl TransactionValidator {
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    /// Structural checks; coinbase transactions are never valid on their own
    pub fn check_structure(&self, tx: &Transaction) -> Result<ValidationResult> {
        match tx {
            Transaction::Regular(regular) => check_transaction(regular),
            Transaction::Coinbase(coinbase) => Ok(structural(format!(
                "coinbase transaction {} is only valid as the first transaction of a block",
                coinbase.id
            ))),
        }
    }

    pub fn check_semantics(&self, tx: &RegularTransaction, utxo_set: &UtxoSet) -> Result<ValidationResult> {
        check_tx_inputs(tx, utxo_set, self.verifier.as_ref())
    }

    /// Structure first, then semantics against `utxo_set`
    pub fn validate(&self, tx: &Transaction, utxo_set: &UtxoSet) -> Result<ValidationResult> {
        let structure = self.check_structure(tx)?;
        if !structure.is_valid() {
            return Ok(structure);
        }
        match tx {
            Transaction::Regular(regular) => self.check_semantics(regular, utxo_set),
            Transaction::Coinbase(_) => Ok(structure),
        }
    }
}

impl std::fmt::Debug for TransactionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionValidator").finish_non_exhaustive()
    }
}

/// CalculateTransactionId: 𝒪𝒫* × 𝒪* × ℕ → ℍ
///
/// SHA-256 of `JSON(inputs) ‖ JSON(outputs) ‖ timestamp`. Inputs are taken
/// without signatures so the id can be signed over.
pub fn calculate_transaction_id(inputs: &[OutPoint], outputs: &[TxOut], timestamp: Natural) -> Result<String> {
    let inputs_json = serde_json::to_string(inputs)?;
    let outputs_json = serde_json::to_string(outputs)?;
    Ok(sha256_hex(format!("{}{}{}", inputs_json, outputs_json, timestamp)))
}

fn structural(reason: String) -> ValidationResult {
    debug!("Transaction rejected: {}", reason);
    ValidationResult::Invalid(Rejection::Structural(reason))
}

fn semantic(violation: SemanticViolation) -> ValidationResult {
    debug!("Transaction rejected: {}", violation);
    ValidationResult::Invalid(Rejection::Semantic(violation))
}
