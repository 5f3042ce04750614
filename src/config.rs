//! Runtime configuration
//!
//! Consensus constants live in [`crate::constants`]; only operational knobs
//! are configurable here.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Difficulty used by [`crate::Ledger::mine_pending`]
    pub default_difficulty: u32,
    pub mining: MiningConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_difficulty: 2,
            mining: MiningConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse a (possibly partial) JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.mining.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Emit a progress line every this many nonces
    pub progress_log_interval: u64,
    /// Nonces handed to the thread pool per round (`parallel` feature)
    pub parallel_batch_size: u64,
    /// Sleep until the wall clock passes the tip timestamp before mining
    pub wait_for_fresh_timestamp: bool,
    /// Upper bound on that sleep, in seconds
    pub max_timestamp_wait_secs: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            progress_log_interval: 100_000,
            parallel_batch_size: 4_096,
            wait_for_fresh_timestamp: true,
            max_timestamp_wait_secs: 10,
        }
    }
}

impl MiningConfig {
    pub fn validate(&self) -> Result<()> {
        if self.progress_log_interval == 0 {
            return Err(LedgerError::Config(
                "progress_log_interval must be positive".to_string(),
            ));
        }
        if self.parallel_batch_size == 0 {
            return Err(LedgerError::Config(
                "parallel_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
