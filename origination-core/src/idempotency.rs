//! Idempotency-key cache for mutating requests.
//!
//! A request carrying a key that was already answered within the TTL gets the
//! cached answer back and the operation is not run again. Only successful
//! results are cached, so a failed request can be retried with the same key.
//!
//! Two concurrent first-time requests with the same key can both run the
//! operation. The later one overwrites the cached value.

use compact_str::{CompactString, format_compact};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 10_000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Longest lifetime an entry can get. Longer TTLs are clamped to this.
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

struct Entry<V> {
    value: V,
    expires_at: Instant,
    seq: u64,
}

struct State<V> {
    entries: HashMap<CompactString, Entry<V>>,
    /// Expiry index. `seq` breaks ties between keys stored at the same instant.
    by_expiry: BTreeMap<(Instant, u64), CompactString>,
    next_seq: u64,
}

impl<V> State<V> {
    fn remove(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.by_expiry.remove(&(entry.expires_at, entry.seq));
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant) {
        while let Some(entry) = self.by_expiry.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let key = entry.remove();
            self.entries.remove(&key);
        }
    }

    fn evict_earliest(&mut self) {
        if let Some((_, key)) = self.by_expiry.pop_first() {
            debug!(key = %key, "Evicting idempotency entry");
            self.entries.remove(&key);
        }
    }
}

pub struct IdempotencyGuard<V> {
    capacity: usize,
    ttl: Duration,
    state: Mutex<State<V>>,
}

impl<V: Clone> Default for IdempotencyGuard<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl<V: Clone> IdempotencyGuard<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            state: Mutex::new(State {
                entries: HashMap::new(),
                by_expiry: BTreeMap::new(),
                next_seq: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached value for `key`, unless it has expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().await;
        let expires_at = state.entries.get(key)?.expires_at;
        if expires_at <= Instant::now() {
            state.remove(key);
            return None;
        }
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    ///
    /// `ttl` is clamped to [`MAX_TTL`]. When the cache is full and `key` is
    /// new, expired entries are dropped first and then the entry closest to
    /// expiry is evicted.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        let Some(expires_at) = now.checked_add(ttl.min(MAX_TTL)) else {
            warn!(key, ?ttl, "Idempotency TTL overflows the clock; not caching");
            return;
        };
        let mut state = self.state.lock().await;

        let replacing = state.remove(key).is_some();
        if !replacing && state.entries.len() >= self.capacity {
            state.purge_expired(now);
            if state.entries.len() >= self.capacity {
                state.evict_earliest();
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .by_expiry
            .insert((expires_at, seq), CompactString::from(key));
        state.entries.insert(
            CompactString::from(key),
            Entry {
                value,
                expires_at,
                seq,
            },
        );
    }

    /// Run `f` at most once per `(operation, key)` within the TTL.
    ///
    /// Without a key the operation always runs.
    pub async fn guard<F, Fut, E>(&self, key: Option<&str>, operation: &str, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let Some(key) = key else {
            return f().await;
        };
        let scoped = format_compact!("{operation}:{key}");

        if let Some(cached) = self.get(&scoped).await {
            debug!(operation, key, "Returning cached response");
            return Ok(cached);
        }

        let value = f().await?;
        self.set(&scoped, value.clone(), self.ttl).await;
        Ok(value)
    }
}
