//! Proof of Work

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::MiningConfig;
use crate::error::{LedgerError, Result};
use crate::hash::BlockPreimage;
use crate::types::*;

/// HashMatchesDifficulty: ℍ × ℕ → {true, false}
///
/// True when the binary form of the hex digest starts with at least
/// `difficulty` zero bits. A non-hex character ends the count.
pub fn hash_matches_difficulty(hash: &str, difficulty: u32) -> bool {
    leading_zero_bits(hash) >= difficulty
}

/// Number of leading zero bits in a hex digest
pub fn leading_zero_bits(hash: &str) -> u32 {
    let mut bits = 0;
    for c in hash.chars() {
        match c.to_digit(16) {
            Some(0) => bits += 4,
            Some(nibble) => return bits + nibble.leading_zeros() - 28,
            None => return bits,
        }
    }
    bits
}

/// CheckProofOfWork: ℬ → {true, false}
///
/// Only the declared hash is inspected; hash integrity is checked separately.
pub fn check_proof_of_work(block: &Block) -> bool {
    hash_matches_difficulty(&block.hash, block.difficulty)
}

/// Cooperative cancellation signal shared with an in-flight search.
///
/// A signal raised while no search runs stops the next one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the signal so later searches run again
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Nonce search state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Searching { next_nonce: Natural },
    Found { nonce: Natural, hash: HashHex },
}

/// Sequential nonce search, one attempt per [`NonceSearch::step`]
pub struct NonceSearch<'a> {
    preimage: &'a BlockPreimage,
    state: SearchState,
}

impl<'a> NonceSearch<'a> {
    pub fn new(preimage: &'a BlockPreimage) -> Self {
        Self {
            preimage,
            state: SearchState::Searching { next_nonce: 0 },
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Try the next nonce. `Found` is terminal.
    pub fn step(&mut self) -> Result<&SearchState> {
        if let SearchState::Searching { next_nonce } = self.state {
            let hash = self.preimage.hash_with_nonce(next_nonce);
            self.state = if hash_matches_difficulty(&hash, self.preimage.difficulty()) {
                SearchState::Found { nonce: next_nonce, hash }
            } else {
                let next_nonce = next_nonce
                    .checked_add(1)
                    .ok_or(LedgerError::NonceSpaceExhausted)?;
                SearchState::Searching { next_nonce }
            };
        }
        Ok(&self.state)
    }
}

/// FindNonce: ℙ × ℕ → ℕ × ℍ
///
/// Search until a nonce satisfies the preimage difficulty or `cancel` fires.
/// No upper bound on the search length is enforced here.
pub fn find_nonce(
    preimage: &BlockPreimage,
    config: &MiningConfig,
    cancel: &CancelToken,
) -> Result<(Natural, HashHex)> {
    #[cfg(feature = "parallel")]
    {
        find_nonce_parallel(preimage, config, cancel)
    }
    #[cfg(not(feature = "parallel"))]
    {
        find_nonce_sequential(preimage, config, cancel)
    }
}

/// Sequential search from nonce 0
pub fn find_nonce_sequential(
    preimage: &BlockPreimage,
    config: &MiningConfig,
    cancel: &CancelToken,
) -> Result<(Natural, HashHex)> {
    let interval = config.progress_log_interval.max(1);
    let mut search = NonceSearch::new(preimage);

    loop {
        match search.step()? {
            SearchState::Found { nonce, hash } => return Ok((*nonce, hash.clone())),
            SearchState::Searching { next_nonce } => {
                let attempts = *next_nonce;
                if cancel.is_cancelled() {
                    warn!("Nonce search cancelled after {} attempts", attempts);
                    return Err(LedgerError::MiningCancelled { attempts });
                }
                if attempts % interval == 0 {
                    debug!("Mining... nonce: {}", attempts);
                }
            }
        }
    }
}

/// Batched search across the rayon pool.
///
/// Any nonce in the batch that satisfies the difficulty is accepted; it is not
/// necessarily the smallest one.
#[cfg(feature = "parallel")]
pub fn find_nonce_parallel(
    preimage: &BlockPreimage,
    config: &MiningConfig,
    cancel: &CancelToken,
) -> Result<(Natural, HashHex)> {
    use rayon::prelude::*;

    let batch = config.parallel_batch_size.max(1);
    let difficulty = preimage.difficulty();
    let mut start: Natural = 0;

    loop {
        if cancel.is_cancelled() {
            warn!("Nonce search cancelled after {} attempts", start);
            return Err(LedgerError::MiningCancelled { attempts: start });
        }

        let end = start.saturating_add(batch);
        let found = (start..end).into_par_iter().find_map_any(|nonce| {
            if cancel.is_cancelled() {
                return None;
            }
            let hash = preimage.hash_with_nonce(nonce);
            hash_matches_difficulty(&hash, difficulty).then_some((nonce, hash))
        });

        if let Some(result) = found {
            return Ok(result);
        }
        if end == Natural::MAX {
            return Err(LedgerError::NonceSpaceExhausted);
        }
        debug!("Mining... nonces {}..{} exhausted", start, end);
        start = end;
    }
}
