use crate::config::{CacheConfig, MAX_DURATION};
use crate::error::{CacheError, Result};
use crate::metrics::CacheMetrics;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type Pending<V, E> = Shared<BoxFuture<'static, std::result::Result<V, E>>>;

/// A settled value and the instant after which it counts as absent.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A fetch that has been registered but not settled yet. `generation` tells a
/// finishing fetch whether it still owns its key or was detached by an
/// invalidation in the meantime.
struct InFlight<V, E> {
    generation: u64,
    pending: Pending<V, E>,
}

struct State<V, E> {
    entries: HashMap<String, CacheEntry<V>>,
    last_requested: HashMap<String, Instant>,
    in_flight: HashMap<String, InFlight<V, E>>,
    next_generation: u64,
    metrics: CacheMetrics,
}

impl<V: Clone, E> State<V, E> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_requested: HashMap::new(),
            in_flight: HashMap::new(),
            next_generation: 0,
            metrics: CacheMetrics::new(),
        }
    }

    /// Fresh value for `key`, dropping the entry if it has expired.
    fn fresh(&mut self, key: &str, now: Instant) -> Option<V> {
        let fresh = self.entries.get(key).map(|entry| entry.is_fresh(now))?;
        if fresh {
            return self.entries.get(key).map(|entry| entry.value.clone());
        }

        self.entries.remove(key);
        self.metrics.expired += 1;
        None
    }

    fn owns(&self, key: &str, generation: u64) -> bool {
        self.in_flight
            .get(key)
            .is_some_and(|in_flight| in_flight.generation == generation)
    }

    /// Forget everything about `key`. An in-flight fetch is detached, not
    /// stopped: its waiters still get its outcome.
    fn forget(&mut self, key: &str) -> bool {
        let had_entry = self.entries.remove(key).is_some();
        let had_stamp = self.last_requested.remove(key).is_some();
        let had_fetch = self.in_flight.remove(key).is_some();
        had_entry || had_stamp || had_fetch
    }
}

/// Clears the in-flight registration of a fetch however the fetch ends,
/// including a panicking producer.
struct Settle<'a, V: Clone, E> {
    state: &'a Mutex<State<V, E>>,
    key: &'a str,
    generation: u64,
}

impl<V: Clone, E> Settle<'_, V, E> {
    fn finish(self, result: &std::result::Result<V, E>, ttl: Duration) {
        let mut state = self.state.lock();
        let owned = state.owns(self.key, self.generation);

        match result {
            // ttl comes from a validated config, so it is at most MAX_DURATION
            Ok(value) if owned => {
                state.entries.insert(
                    self.key.to_string(),
                    CacheEntry {
                        value: value.clone(),
                        expires_at: Instant::now() + ttl,
                    },
                );
            }
            Ok(_) => {
                log::debug!(
                    "fetch for {} was invalidated in flight; result not stored",
                    self.key
                );
            }
            Err(_) => {
                state.metrics.failures += 1;
                if owned {
                    state.entries.remove(self.key);
                }
                log::warn!("fetch for {} failed; nothing cached", self.key);
            }
        }

        if owned {
            state.in_flight.remove(self.key);
        }
    }
}

impl<V: Clone, E> Drop for Settle<'_, V, E> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.owns(self.key, self.generation) {
            state.in_flight.remove(self.key);
        }
    }
}

/// In-memory request cache.
///
/// Coalesces concurrent fetches of the same key into one producer call, serves
/// fresh results for a TTL, spaces producer calls for a key by a throttle
/// window and supports invalidation by key or by pattern.
///
/// The handle is cheap to clone; clones share the same state. Construct one
/// per application (or per test) and hand it to every caller.
pub struct RequestCache<V, E> {
    config: Arc<CacheConfig>,
    state: Arc<Mutex<State<V, E>>>,
}

impl<V, E> Clone for RequestCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
        }
    }
}

impl<V, E> fmt::Debug for RequestCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RequestCache")
            .field("config", &self.config)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

impl<V: Clone, E> Default for RequestCache<V, E> {
    fn default() -> Self {
        Self {
            config: Arc::new(CacheConfig::default()),
            state: Arc::new(Mutex::new(State::new())),
        }
    }
}

impl<V: Clone, E> RequestCache<V, E> {
    /// Create a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(State::new())),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached value for `key` if it hasn't expired. An expired entry is
    /// removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        self.state.lock().fresh(key, Instant::now())
    }

    /// Store `value` under `key` for the default TTL, replacing any entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Err(e) = self.insert(key, value, self.config.default_ttl) {
            log::warn!("value not cached: {}", e);
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any entry. `ttl` must be
    /// positive and at most [`MAX_DURATION`].
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) -> Result<()> {
        let key = key.into();
        if ttl.is_zero() || ttl > MAX_DURATION {
            return Err(CacheError::InvalidTtl { key, ttl });
        }

        self.insert(key, value, ttl)
    }

    fn insert(&self, key: String, value: V, ttl: Duration) -> Result<()> {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            return Err(CacheError::InvalidTtl { key, ttl });
        };
        self.state
            .lock()
            .entries
            .insert(key, CacheEntry { value, expires_at });
        Ok(())
    }

    /// Drop the entry for `key` and its throttle timestamp, so the next
    /// request fetches immediately. A fetch in flight for `key` is detached:
    /// it still answers its current waiters but won't repopulate the cache.
    pub fn invalidate(&self, key: &str) {
        let mut state = self.state.lock();
        if state.forget(key) {
            state.metrics.invalidations += 1;
            log::debug!("invalidated {}", key);
        }
    }

    /// Invalidate every key matching `pattern` under the configured
    /// [`crate::KeyMatch`]. Returns the number of keys dropped.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        let key_match = self.config.key_match;
        let dropped = self.invalidate_where(|key| key_match.matches(key, pattern));
        log::debug!("invalidated {} keys matching {:?}", dropped, pattern);
        dropped
    }

    /// Invalidate every key for which `predicate` returns true. Returns the
    /// number of keys dropped.
    pub fn invalidate_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&str) -> bool,
    {
        // the predicate runs unlocked so it may call back into the cache
        let known: HashSet<String> = {
            let state = self.state.lock();
            state
                .entries
                .keys()
                .chain(state.last_requested.keys())
                .chain(state.in_flight.keys())
                .cloned()
                .collect()
        };

        let matched: Vec<String> = known
            .into_iter()
            .filter(|key| predicate(key.as_str()))
            .collect();

        let mut state = self.state.lock();
        let mut dropped = 0;
        for key in &matched {
            if state.forget(key) {
                dropped += 1;
            }
        }
        state.metrics.invalidations += dropped as u64;

        dropped
    }

    /// Remove every expired entry now rather than on the next read, along
    /// with throttle timestamps that no longer delay anything. Returns how
    /// many entries were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let window = self.config.throttle_window;
        let mut state = self.state.lock();

        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh(now));
        let purged = before - state.entries.len();
        state.metrics.expired += purged as u64;

        let State {
            last_requested,
            in_flight,
            ..
        } = &mut *state;
        last_requested.retain(|key, at| {
            in_flight.contains_key(key) || now.saturating_duration_since(*at) < window
        });

        purged
    }

    /// Drop every entry, throttle timestamp and in-flight registration.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.last_requested.clear();
        state.in_flight.clear();
    }

    /// Whether a fetch for `key` is registered and not yet settled.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.state.lock().in_flight.contains_key(key)
    }

    /// Stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }
}

impl<V, E> RequestCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Resolve `key`, calling `producer` only when needed.
    ///
    /// 1. A fetch already in flight for `key` is joined; `producer` is dropped.
    /// 2. A fresh cached value is returned as-is.
    /// 3. Otherwise a fetch is registered. It first waits out whatever is left
    ///    of the throttle window since the previous fetch for `key`, then
    ///    calls `producer`. Success is cached for the default TTL; failure
    ///    removes any entry and is returned unchanged.
    ///
    /// Every caller that joins a fetch sees the same value or error. The fetch
    /// runs on its own task and completes even if all callers go away.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn throttled_request<F, Fut>(
        &self,
        key: impl Into<String>,
        producer: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let key = key.into();

        let pending = {
            let mut state = self.state.lock();

            if let Some(pending) = state.in_flight.get(&key).map(|f| f.pending.clone()) {
                state.metrics.joined += 1;
                log::debug!("joining fetch in flight for {}", key);
                pending
            } else {
                let now = Instant::now();
                if let Some(value) = state.fresh(&key, now) {
                    state.metrics.hits += 1;
                    return Ok(value);
                }

                let wait = match state.last_requested.get(&key) {
                    Some(at) => self
                        .config
                        .throttle_window
                        .saturating_sub(now.saturating_duration_since(*at)),
                    None => Duration::ZERO,
                };

                state.metrics.misses += 1;
                if !wait.is_zero() {
                    state.metrics.throttled += 1;
                    log::debug!("throttling fetch for {} by {:?}", key, wait);
                }

                // stamped with the time the producer will actually be called;
                // wait never exceeds the validated throttle window
                state.last_requested.insert(key.clone(), now + wait);

                let generation = state.next_generation;
                state.next_generation += 1;

                let pending = self.spawn_fetch(key.clone(), generation, wait, producer);
                state.in_flight.insert(
                    key,
                    InFlight {
                        generation,
                        pending: pending.clone(),
                    },
                );
                pending
            }
        };

        pending.await
    }

    fn spawn_fetch<F, Fut>(
        &self,
        key: String,
        generation: u64,
        wait: Duration,
        producer: F,
    ) -> Pending<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let ttl = self.config.default_ttl;
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            let settle = Settle {
                state: &state,
                key: &task_key,
                generation,
            };
            let result = producer().await;
            settle.finish(&result, ttl);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                // only reachable while the runtime shuts down
                Err(err) => panic!("fetch task for {} was cancelled: {}", key, err),
            }
        }
        .boxed()
        .shared()
    }
}
