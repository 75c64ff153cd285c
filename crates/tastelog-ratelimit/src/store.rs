//! The counter-store interface shared by every backend.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Counter state immediately after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Increment {
    /// Requests counted in the current window, including this one.
    pub count: u64,
    /// Time until the current window ends.
    pub reset: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or did not answer in time.
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something other than a counter.
    #[error("rate limit store protocol error: {0}")]
    Protocol(String),
}

/// Atomic fixed-window counters.
///
/// `increment` creates the counter with a lifetime of `window` when it does not exist
/// (or has expired) and bumps it otherwise, as one atomic step. Concurrent increments
/// of the same key are never lost.
#[async_trait]
pub trait RateLimitStore: Send + Sync + fmt::Debug {
    async fn increment(&self, key: &str, window: Duration) -> Result<Increment, StoreError>;

    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;

    /// `true` when counters are only visible to this process.
    fn is_process_local(&self) -> bool {
        false
    }
}

/// Server-side script shared by the REST and Redis stores.
///
/// `KEYS[1]` is the counter key, `ARGV[1]` the window in milliseconds. Returns
/// `{count, ttl_ms}`. A counter left without an expiry is given one.
pub(crate) const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Turns a script reply into an [`Increment`].
pub(crate) fn increment_from_reply(
    count: i64,
    ttl_ms: i64,
    window: Duration,
) -> Result<Increment, StoreError> {
    let count = u64::try_from(count)
        .ok()
        .filter(|c| *c > 0)
        .ok_or_else(|| StoreError::Protocol(format!("counter out of range: {}", count)))?;

    let reset = u64::try_from(ttl_ms)
        .map(Duration::from_millis)
        .unwrap_or(window);

    Ok(Increment { count, reset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_conversion() {
        let window = Duration::from_secs(60);
        assert_eq!(
            increment_from_reply(3, 41_500, window),
            Ok(Increment {
                count: 3,
                reset: Duration::from_millis(41_500)
            })
        );
        assert_eq!(increment_from_reply(1, -1, window).unwrap().reset, window);
        assert!(matches!(
            increment_from_reply(0, 100, window),
            Err(StoreError::Protocol(_))
        ));
    }
}
