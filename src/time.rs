//! Wall-clock helpers

use chrono::Utc;
use log::{debug, warn};
use std::time::{Duration, Instant};

use crate::error::{LedgerError, Result};
use crate::pow::CancelToken;
use crate::types::Natural;

/// Current Unix time in seconds (block timestamps)
pub fn unix_seconds() -> Natural {
    Utc::now().timestamp().max(0) as Natural
}

/// Current Unix time in milliseconds (transaction timestamps)
pub fn unix_millis() -> Natural {
    Utc::now().timestamp_millis().max(0) as Natural
}

/// Granularity of [`wait_until_after`]
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Block until `unix_seconds()` is strictly greater than `timestamp`.
///
/// Sleeps in short slices so `cancel` is honoured, and gives up after
/// `max_wait`. Giving up is not an error: a block stamped before the tip is
/// rejected by the timestamp check.
pub fn wait_until_after(timestamp: Natural, max_wait: Duration, cancel: &CancelToken) -> Result<()> {
    let now = unix_seconds();
    if now > timestamp {
        return Ok(());
    }
    debug!(
        "Waiting up to {}s for a fresh block timestamp",
        (timestamp - now + 1).min(max_wait.as_secs())
    );

    let deadline = Instant::now().checked_add(max_wait);
    while unix_seconds() <= timestamp {
        if cancel.is_cancelled() {
            warn!("Wait for a fresh block timestamp cancelled");
            return Err(LedgerError::MiningCancelled { attempts: 0 });
        }
        let slice = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    warn!("Tip timestamp {} is still ahead of the clock after {:?}", timestamp, max_wait);
                    return Ok(());
                }
                left.min(WAIT_SLICE)
            }
            None => WAIT_SLICE,
        };
        std::thread::sleep(slice);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_units_agree() {
        let seconds = unix_seconds();
        let millis = unix_millis();
        assert!(millis / 1000 >= seconds);
        assert!(millis / 1000 - seconds <= 1);
    }

    #[test]
    fn test_wait_for_past_timestamp_returns_immediately() {
        let start = Instant::now();
        wait_until_after(0, Duration::from_secs(60), &CancelToken::new()).unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_wait_for_current_second() {
        let now = unix_seconds();
        wait_until_after(now, Duration::from_secs(60), &CancelToken::new()).unwrap();
        assert!(unix_seconds() > now);
    }

    #[test]
    fn test_wait_for_future_timestamp_is_capped() {
        let far_future = unix_seconds() + 365 * 24 * 3600;
        let start = Instant::now();
        wait_until_after(far_future, Duration::from_millis(300), &CancelToken::new()).unwrap();

        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(300));
        assert!(waited < Duration::from_secs(2));
    }

    #[test]
    fn test_wait_is_cancellable() {
        let far_future = unix_seconds() + 365 * 24 * 3600;
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            remote.cancel();
        });

        let start = Instant::now();
        let result = wait_until_after(far_future, Duration::from_secs(3600), &cancel);
        handle.join().unwrap();
        assert!(matches!(result, Err(LedgerError::MiningCancelled { attempts: 0 })));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
