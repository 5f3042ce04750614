//! UTXO set maintenance

use log::debug;
use std::collections::HashSet;

use crate::error::{Result, SemanticViolation};
use crate::transaction::{check_tx_id_unused, TransactionValidator};
use crate::types::*;

/// ApplyTransaction: 𝒯𝒳 × 𝒰𝒮 → 𝒰𝒮
///
/// For transaction tx and UTXO set us:
/// 1. If tx is regular: us' = us \ {(i.transactionOutputId, i.outputIndex) : i ∈ tx.ins}
/// 2. us'' = us' ∪ {(tx.id, k) ↦ tx.outs[k] : k ∈ [0, |tx.outs|)}
pub fn apply_transaction(tx: &Transaction, utxo_set: &mut UtxoSet) {
    if let Transaction::Regular(regular) = tx {
        for outpoint in regular.outpoints() {
            utxo_set.remove(&outpoint);
        }
    }

    for (k, output) in tx.outputs().iter().enumerate() {
        let entry = UnspentOutput {
            transaction_output_id: tx.id().to_string(),
            output_index: k as Natural,
            address: output.address.clone(),
            amount: output.amount,
            public_key: output.public_key.clone(),
        };
        utxo_set.insert(entry.outpoint(), entry);
    }
}

/// ConnectBlock: ℬ × 𝒰𝒮 × 𝒱 → {valid, invalid} × 𝒰𝒮
///
/// For block b with transactions txs and UTXO set us:
/// 1. For each tx ∈ txs in order:
///    - tx.id is unique within b and names no output in the set built so far
///    - if tx is regular, validate it against that set
///    - apply tx to that set
/// 2. Return (valid, us') if every transaction validated, else (invalid, us)
///
/// Validating against the evolving set rejects two transactions in the same
/// block spending one output. Coinbase placement and amount are block-level
/// consensus checks and are not repeated here.
pub fn connect_block(
    block: &Block,
    utxo_set: UtxoSet,
    validator: &TransactionValidator,
) -> Result<(ValidationResult, UtxoSet)> {
    let mut working = utxo_set.clone();
    let mut seen_ids = HashSet::with_capacity(block.transactions.len());

    for (i, tx) in block.transactions.iter().enumerate() {
        let mut result = if seen_ids.insert(tx.id()) {
            check_tx_id_unused(tx, &working)
        } else {
            ValidationResult::Invalid(SemanticViolation::DuplicateTransactionId(tx.id().to_string()).into())
        };
        if result.is_valid() && !tx.is_coinbase() {
            result = validator.validate(tx, &working)?;
        }
        if let ValidationResult::Invalid(rejection) = result {
            debug!(
                "Block {} transaction {} ({}) rejected: {}",
                block.index,
                i,
                tx.id(),
                rejection
            );
            return Ok((ValidationResult::Invalid(rejection), utxo_set));
        }
        apply_transaction(tx, &mut working);
    }

    Ok((ValidationResult::Valid, working))
}

/// Replay every block of `chain` into a fresh set without validation
pub fn rebuild_utxo_set(chain: &[Block]) -> UtxoSet {
    let mut utxo_set = UtxoSet::new();
    for tx in chain.iter().flat_map(|block| block.transactions.iter()) {
        apply_transaction(tx, &mut utxo_set);
    }
    utxo_set
}

/// Sum of all unspent outputs owned by `address`
pub fn balance_of(utxo_set: &UtxoSet, address: &str) -> Amount {
    utxo_set
        .values()
        .filter(|u| u.address == address)
        .map(|u| u.amount)
        .sum()
}

/// Unspent outputs owned by `address`, ordered by outpoint
pub fn unspent_outputs_for(utxo_set: &UtxoSet, address: &str) -> Vec<UnspentOutput> {
    let mut outputs: Vec<UnspentOutput> = utxo_set
        .values()
        .filter(|u| u.address == address)
        .cloned()
        .collect();
    outputs.sort_by(|a, b| a.outpoint().cmp(&b.outpoint()));
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coinbase::create_coinbase_transaction_at;
    use crate::error::Rejection;
    use crate::verification::SignatureVerifier;
    use std::sync::Arc;

    fn validator() -> TransactionValidator {
        let verifier: Arc<dyn SignatureVerifier> =
            Arc::new(|_: &str, _: &str, _: Natural, _: Amount, _: &str, _: &str| true);
        TransactionValidator::new(verifier)
    }

    fn coinbase(height: Natural, address: &str) -> Transaction {
        Transaction::Coinbase(create_coinbase_transaction_at(height, address, "pk", 50.0, None, height).unwrap())
    }

    fn transfer(id: &str, from: &OutPoint, to: &str, amount: Amount) -> Transaction {
        Transaction::Regular(RegularTransaction {
            id: id.to_string(),
            timestamp: 1,
            tx_ins: vec![TxIn {
                transaction_output_id: from.transaction_output_id.clone(),
                output_index: from.output_index,
                signature: "sig".to_string(),
            }],
            tx_outs: vec![TxOut {
                address: to.to_string(),
                amount,
                public_key: format!("{}-pk", to),
            }],
        })
    }

    fn block(index: Natural, transactions: Vec<Transaction>) -> Block {
        Block {
            index,
            timestamp: index,
            transactions,
            previous_hash: "0".repeat(64),
            hash: "0".repeat(64),
            nonce: 0,
            difficulty: 0,
        }
    }

    fn funded(address: &str) -> (UtxoSet, OutPoint) {
        let mut set = UtxoSet::new();
        let cb = coinbase(1, address);
        apply_transaction(&cb, &mut set);
        let outpoint = OutPoint {
            transaction_output_id: cb.id().to_string(),
            output_index: 0,
        };
        (set, outpoint)
    }

    #[test]
    fn test_apply_coinbase_creates_output() {
        let (set, outpoint) = funded("alice");
        assert_eq!(set.len(), 1);
        assert_eq!(set[&outpoint].amount, 50.0);
        assert_eq!(balance_of(&set, "alice"), 50.0);
    }

    #[test]
    fn test_apply_transfer_moves_value() {
        let (mut set, outpoint) = funded("alice");
        apply_transaction(&transfer("t1", &outpoint, "bob", 30.0), &mut set);

        assert!(!set.contains_key(&outpoint));
        assert_eq!(balance_of(&set, "alice"), 0.0);
        assert_eq!(balance_of(&set, "bob"), 30.0);
        assert_eq!(unspent_outputs_for(&set, "bob")[0].transaction_output_id, "t1");
    }

    #[test]
    fn test_connect_block_applies_in_order() {
        let (set, outpoint) = funded("alice");
        let b = block(2, vec![coinbase(2, "miner"), transfer("t1", &outpoint, "bob", 50.0)]);

        let (result, next) = connect_block(&b, set, &validator()).unwrap();
        assert!(result.is_valid());
        assert_eq!(balance_of(&next, "bob"), 50.0);
        assert_eq!(balance_of(&next, "miner"), 50.0);
        assert_eq!(balance_of(&next, "alice"), 0.0);
    }

    #[test]
    fn test_intra_block_double_spend_rejected() {
        let (set, outpoint) = funded("alice");
        let b = block(
            2,
            vec![
                coinbase(2, "miner"),
                transfer("t1", &outpoint, "bob", 50.0),
                transfer("t2", &outpoint, "carol", 50.0),
            ],
        );

        let (result, unchanged) = connect_block(&b, set.clone(), &validator()).unwrap();
        assert_eq!(
            result.rejection(),
            Some(&Rejection::Semantic(SemanticViolation::UnknownOutput(outpoint)))
        );
        assert_eq!(unchanged, set);
    }

    #[test]
    fn test_reused_id_cannot_overwrite_unspent_outputs() {
        let (set, outpoint) = funded("alice");
        let (result, bobs) = connect_block(
            &block(2, vec![coinbase(2, "miner"), transfer("t1", &outpoint, "bob", 50.0)]),
            set,
            &validator(),
        )
        .unwrap();
        assert!(result.is_valid());

        // Mallory spends her own output under the id that still holds Bob's coins
        let mallory_coinbase = coinbase(3, "mallory");
        let mallory_outpoint = OutPoint {
            transaction_output_id: mallory_coinbase.id().to_string(),
            output_index: 0,
        };
        let b = block(3, vec![mallory_coinbase, transfer("t1", &mallory_outpoint, "mallory", 1.0)]);

        let (result, unchanged) = connect_block(&b, bobs.clone(), &validator()).unwrap();
        assert_eq!(
            result.rejection(),
            Some(&Rejection::Semantic(SemanticViolation::DuplicateTransactionId("t1".to_string())))
        );
        assert_eq!(unchanged, bobs);
        assert_eq!(balance_of(&unchanged, "bob"), 50.0);
    }

    #[test]
    fn test_duplicate_id_within_block_rejected() {
        let mut set = UtxoSet::new();
        let first = coinbase(1, "alice");
        let second = coinbase(2, "alice");
        apply_transaction(&first, &mut set);
        apply_transaction(&second, &mut set);
        let outpoint = |tx: &Transaction| OutPoint {
            transaction_output_id: tx.id().to_string(),
            output_index: 0,
        };

        let b = block(
            3,
            vec![
                coinbase(3, "miner"),
                transfer("t1", &outpoint(&first), "bob", 50.0),
                transfer("t1", &outpoint(&second), "carol", 50.0),
            ],
        );
        let (result, unchanged) = connect_block(&b, set.clone(), &validator()).unwrap();
        assert_eq!(
            result.rejection(),
            Some(&Rejection::Semantic(SemanticViolation::DuplicateTransactionId("t1".to_string())))
        );
        assert_eq!(unchanged, set);
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let (_, outpoint) = funded("alice");
        let chain = vec![
            block(1, vec![coinbase(1, "alice")]),
            block(2, vec![coinbase(2, "miner"), transfer("t1", &outpoint, "bob", 20.0)]),
        ];
        let rebuilt = rebuild_utxo_set(&chain);

        assert_eq!(balance_of(&rebuilt, "bob"), 20.0);
        assert_eq!(balance_of(&rebuilt, "miner"), 50.0);
        assert_eq!(balance_of(&rebuilt, "alice"), 0.0);
    }

    #[test]
    fn test_unspent_outputs_sorted() {
        let mut set = UtxoSet::new();
        for height in [3, 1, 2] {
            apply_transaction(&coinbase(height, "alice"), &mut set);
        }
        let outputs = unspent_outputs_for(&set, "alice");
        assert_eq!(outputs.len(), 3);
        assert!(outputs.windows(2).all(|w| w[0].outpoint() <= w[1].outpoint()));
        assert!(unspent_outputs_for(&set, "nobody").is_empty());
    }
}
