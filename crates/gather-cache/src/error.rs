use crate::config::MAX_DURATION;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Misuse of the cache API. Producer failures never show up here; they are
/// returned to the caller as-is by [`crate::RequestCache::throttled_request`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Invalid TTL for key {key:?}: {ttl:?} (must be > 0 and at most {max:?})", max = MAX_DURATION)]
    InvalidTtl { key: String, ttl: Duration },

    #[error("Invalid throttle window: {0:?} (must be at most {max:?})", max = MAX_DURATION)]
    InvalidThrottleWindow(Duration),

    #[error("Validation error: {0}")]
    Validation(String),
}
