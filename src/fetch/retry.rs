//! Retry with exponential backoff for the generation endpoint
//!
//! The endpoint is a best-effort public service with no SLA; rate limiting
//! and transient 5xx responses are common, so the fetcher retries hard
//! before giving up.

use std::time::{Duration, SystemTime};

/// Retry policy for generation requests
///
/// Controls how many times a failed download is retried and how long to
/// wait between attempts using exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts before the clip fails the build
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 30,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Whether an HTTP status indicates a transient failure worth retrying.
///
/// Rate limits (429) and server errors (5xx) are transient; other client
/// errors mean the request itself is wrong and retrying won't help.
#[must_use]
pub fn is_recoverable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Compute the delay before the next retry attempt:
/// `min(base_delay * 2^attempt, max_delay) + jitter`.
///
/// Jitter is 0-200ms derived from `SystemTime`, spreading out concurrent
/// workers retrying against the same endpoint.
#[must_use]
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let base = base.min(policy.max_delay);

    let jitter_nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let jitter = Duration::from_millis(u64::from(jitter_nanos % 200));

    base + jitter
}
