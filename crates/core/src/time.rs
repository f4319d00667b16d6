//! Epoch-millisecond helpers shared by the persisted cache tiers.
//!
//! Both persistent tiers embed creation timestamps in their payloads
//! (neither has native expiration), so the whole workspace agrees on
//! milliseconds since the Unix epoch as the wire representation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time as milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds remaining until `deadline_ms`, zero if already past.
pub fn ms_until_epoch(deadline_ms: u64) -> u64 {
    deadline_ms.saturating_sub(epoch_ms())
}

/// Whether an entry created at `timestamp_ms` with lifetime `ttl` has
/// passed its expiry boundary. An entry is readable only while
/// `now - timestamp <= ttl`.
pub fn is_expired(timestamp_ms: u64, ttl: Duration) -> bool {
    epoch_ms().saturating_sub(timestamp_ms) > ttl.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_ms_monotonic_enough() {
        let a = epoch_ms();
        let b = epoch_ms();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000); // sanity: after 2020
    }

    #[test]
    fn test_is_expired_boundary() {
        let now = epoch_ms();
        assert!(!is_expired(now, Duration::from_secs(60)));
        assert!(is_expired(now - 61_000, Duration::from_secs(60)));
    }

    #[test]
    fn test_ms_until_epoch_saturates() {
        assert_eq!(ms_until_epoch(0), 0);
        let future = epoch_ms() + 5_000;
        let remaining = ms_until_epoch(future);
        assert!(remaining > 4_000 && remaining <= 5_000);
    }
}
