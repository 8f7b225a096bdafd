use serde::{Deserialize, Serialize};

/// Counters for request cache observability.
///
/// Counted by [`crate::RequestCache::throttled_request`] and the invalidation
/// calls; plain `get`/`set` don't touch them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Requests answered from a fresh entry.
    pub hits: u64,

    /// Requests that had to start a fetch.
    pub misses: u64,

    /// Requests that joined a fetch already in flight.
    pub joined: u64,

    /// Fetches that waited out a throttle window before calling the producer.
    pub throttled: u64,

    /// Producer calls that returned an error.
    pub failures: u64,

    /// Keys dropped by `invalidate`, `invalidate_matching` or `invalidate_where`.
    pub invalidations: u64,

    /// Entries found expired and removed.
    pub expired: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of producer calls started.
    pub fn fetches(&self) -> u64 {
        self.misses
    }

    /// Share of requests served without a new producer call.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.joined + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits + self.joined) as f64 / total as f64
    }

    /// Get a summary string for logging
    pub fn summary(&self) -> String {
        format!(
            "{} hits, {} joined, {} fetches ({} throttled, {} failed), \
             {} invalidated, {} expired | hit ratio {:.2}",
            self.hits,
            self.joined,
            self.misses,
            self.throttled,
            self.failures,
            self.invalidations,
            self.expired,
            self.hit_ratio()
        )
    }
}
