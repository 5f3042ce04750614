//! Signature verification capability
//!
//! The ledger never handles private keys. Transaction validation consumes a
//! [`SignatureVerifier`] supplied at construction; [`Secp256k1Verifier`] is the
//! reference implementation matching the wallet's signing scheme.

use ripemd::Ripemd160;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, VerifyOnly};
use sha2::{Digest, Sha256};

use crate::types::{Amount, Natural};

/// Verify(txId, outputId, outputIndex, amount, signature, publicKey) → {true, false}
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        tx_id: &str,
        output_id: &str,
        output_index: Natural,
        amount: Amount,
        signature: &str,
        public_key: &str,
    ) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&str, &str, Natural, Amount, &str, &str) -> bool + Send + Sync,
{
    fn verify(
        &self,
        tx_id: &str,
        output_id: &str,
        output_index: Natural,
        amount: Amount,
        signature: &str,
        public_key: &str,
    ) -> bool {
        self(tx_id, output_id, output_index, amount, signature, public_key)
    }
}

/// The string an input signature commits to: `txId ‖ outputId ‖ outputIndex ‖ amount`
pub fn signing_message(tx_id: &str, output_id: &str, output_index: Natural, amount: Amount) -> String {
    format!("{}{}{}{}", tx_id, output_id, output_index, amount)
}

/// SHA-256 of [`signing_message`], the digest that is actually signed
pub fn signing_digest(tx_id: &str, output_id: &str, output_index: Natural, amount: Amount) -> [u8; 32] {
    let hash = Sha256::digest(signing_message(tx_id, output_id, output_index, amount).as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hash);
    digest
}

/// DeriveAddress: 𝕂 → 𝔸
///
/// hex(RIPEMD-160(SHA-256(publicKey))), hashing the hex text of the key
pub fn derive_address(public_key: &str) -> String {
    let sha = Sha256::digest(public_key.as_bytes());
    hex::encode(Ripemd160::digest(sha))
}

/// ECDSA over secp256k1 with hex-encoded DER signatures and SEC1 public keys
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(
        &self,
        tx_id: &str,
        output_id: &str,
        output_index: Natural,
        amount: Amount,
        signature: &str,
        public_key: &str,
    ) -> bool {
        let pubkey = match hex::decode(public_key)
            .ok()
            .and_then(|bytes| PublicKey::from_slice(&bytes).ok())
        {
            Some(pk) => pk,
            None => return false,
        };

        let mut signature = match hex::decode(signature)
            .ok()
            .and_then(|bytes| Signature::from_der(&bytes).ok())
        {
            Some(sig) => sig,
            None => return false,
        };
        // High-S encodings are accepted
        signature.normalize_s();

        let digest = signing_digest(tx_id, output_id, output_index, amount);
        let message = match Message::from_digest_slice(&digest) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}
