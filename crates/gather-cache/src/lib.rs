//! Request cache for client-side data access.
//!
//! [`RequestCache`] sits between callers and whatever fetches their data:
//! - concurrent requests for the same key share one fetch
//! - successful results are served from memory until their TTL runs out
//! - fetches for the same key are spaced by a throttle window
//! - callers invalidate by exact key or by pattern after they mutate data
//!
//! # Example
//! ```rust,no_run
//! use gather_cache::{CacheConfig, CacheKey, RequestCache};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache: RequestCache<String, String> = RequestCache::new(CacheConfig::default())?;
//! let key = CacheKey::new("event", 123);
//!
//! let title = cache
//!     .throttled_request(key.clone(), || async { Ok::<_, String>("Launch Party".to_string()) })
//!     .await?;
//! assert_eq!(cache.get(key.as_str()), Some(title));
//!
//! cache.invalidate_matching("event-123");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod metrics;

pub use cache::{CacheEntry, RequestCache};
pub use config::{CacheConfig, MAX_DURATION};
pub use error::{CacheError, Result};
pub use key::{CacheKey, KeyMatch, KEY_DELIMITER};
pub use metrics::CacheMetrics;
