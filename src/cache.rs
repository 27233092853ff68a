//! Bounded in-memory TTL cache.
//!
//! Entries expire lazily: `get` checks the age of an entry against its TTL
//! and evicts it when stale. When the cache is full, inserting a new key
//! evicts the least-recently-inserted entry.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall-clock time via [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Clone, Debug)]
struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    order: VecDeque<String>,
}

impl<T> Inner<T> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }
}

/// Thread-safe TTL cache keyed by request fingerprint.
pub struct TtlCache<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<T> fmt::Debug for TtlCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl<T: Clone> TtlCache<T> {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero disables storage: every `set` is dropped.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity.min(1024)),
                order: VecDeque::with_capacity(capacity.min(1024)),
            }),
            capacity,
            clock,
        }
    }

    /// Returns the live value for `key`, evicting it if expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let expired = inner.entries.get(key)?.is_expired(now);
        if expired {
            inner.remove(key);
            return None;
        }
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, value: T, ttl: Duration) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };

        let mut inner = self.lock();
        inner.remove(&key);
        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, entry);
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Drops every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let Inner { entries, order } = &mut *inner;
        order.retain(|key| entries.contains_key(key));
        before - entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> TtlCache<T> {
    /// Number of stored entries, expired ones included until they are read or purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
