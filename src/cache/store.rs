//! Cache Store Module
//!
//! The TTL cache engine. One instance backs the server's Drive reads and
//! another backs the client's server-API reads; both share this code.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{
    CacheEntry, CacheKey, CacheSnapshot, CacheStats, Clock, EntryStats, Principal, SystemClock,
};

/// A cache shared between the tasks of one process.
pub type SharedCache<V> = Arc<RwLock<TtlCache<V>>>;

// == TTL Cache ==
/// In-memory key/value store where every entry carries its own expiry.
///
/// There is no capacity bound and no eviction other than TTL. The cache
/// never fetches on a miss; callers fall back to the authoritative source
/// and `set` the result themselves.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Time source for expiry decisions
    clock: Arc<dyn Clock>,
    /// Label used in log lines ("server", "client")
    name: &'static str,
    /// Bumped on every invalidation
    seq: u64,
    /// Sequence of the last invalidation of each key
    invalidated: HashMap<CacheKey, u64>,
    /// Sequence of the last clear or principal drop
    swept_at: u64,
}

/// Marks the moment a fill began. See [`TtlCache::set_if_fresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates an empty cache on the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates an empty cache reading time from `clock`.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
            clock,
            name: "cache",
            seq: 0,
            invalidated: HashMap::new(),
            swept_at: 0,
        }
    }

    /// Sets the label used in log lines.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Wraps the cache for sharing across tasks.
    pub fn into_shared(self) -> SharedCache<V> {
        Arc::new(RwLock::new(self))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The expiry window always restarts from now: `ttl` when given,
    /// otherwise the default TTL.
    pub fn set(&mut self, key: CacheKey, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = self.clock.now_ms();
        debug!(cache = self.name, key = %key, ttl_secs = ttl.as_secs(), "cache set");
        self.entries.insert(key, CacheEntry::new(value, now, ttl));
    }

    // == Fresh Fill ==
    /// Ticket to pass to [`set_if_fresh`](Self::set_if_fresh) once the
    /// authoritative value has been fetched.
    pub fn ticket(&self) -> FillTicket {
        FillTicket(self.seq)
    }

    /// Stores `value` unless `key` was invalidated after `ticket` was taken.
    ///
    /// A fetch that started before a mutation must not write the
    /// pre-mutation value back. Returns whether the value was stored.
    pub fn set_if_fresh(
        &mut self,
        key: CacheKey,
        value: V,
        ttl: Option<Duration>,
        ticket: FillTicket,
    ) -> bool {
        let last = self.invalidated.get(&key).copied().unwrap_or(0).max(self.swept_at);
        if last > ticket.0 {
            debug!(cache = self.name, key = %key, "stale fill dropped");
            return false;
        }
        self.set(key, value, ttl);
        true
    }

    fn bump(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// An entry found expired is removed on the spot. A miss and an expired
    /// hit look the same to the caller.
    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                debug!(cache = self.name, key = %key, "cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_miss();
            self.stats.record_expirations(1);
            debug!(cache = self.name, key = %key, "cache expired");
            return None;
        }

        self.stats.record_hit();
        let entry = self.entries.get(key)?;
        debug!(
            cache = self.name,
            key = %key,
            age_secs = entry.age_ms(now) / 1000,
            "cache hit"
        );
        Some(entry.value.clone())
    }

    // == Delete ==
    /// Removes the entry for `key`. Returns whether anything was removed.
    ///
    /// Fills started before this call are refused even if nothing was stored.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        let seq = self.bump();
        self.invalidated.insert(key.clone(), seq);
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_invalidations(1);
            debug!(cache = self.name, key = %key, "cache delete");
        }
        removed
    }

    // == Delete Principal ==
    /// Removes every entry scoped to `principal`. Returns the count removed.
    pub fn delete_principal(&mut self, principal: &Principal) -> usize {
        self.swept_at = self.bump();
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key.principal.as_ref() != Some(principal));
        let removed = before - self.entries.len();
        self.stats.record_invalidations(removed);
        if removed > 0 {
            debug!(cache = self.name, principal = %principal, removed, "cache principal dropped");
        }
        removed
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.swept_at = self.bump();
        self.invalidated.clear();
        self.stats.record_invalidations(count);
        debug!(cache = self.name, removed = count, "cache cleared");
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        removed
    }

    // == Stats ==
    /// Builds a read-only snapshot.
    ///
    /// Expired entries that have not been purged yet are counted in
    /// `pending_expiry` and left in place.
    pub fn stats(&self) -> CacheSnapshot {
        let now = self.clock.now_ms();
        let mut items = Vec::with_capacity(self.entries.len());
        let mut pending_expiry = 0;

        for (key, entry) in &self.entries {
            if entry.is_expired(now) {
                pending_expiry += 1;
                continue;
            }
            items.push(EntryStats {
                key: key.to_string(),
                age_secs: entry.age_ms(now) / 1000,
                expires_in_secs: entry.ttl_remaining(now),
                stored_at: format_timestamp(entry.stored_at),
            });
        }
        items.sort_by(|a, b| a.key.cmp(&b.key));

        CacheSnapshot {
            size: items.len(),
            pending_expiry,
            items,
            hit_rate: self.stats.hit_rate(),
            counters: self.stats.clone(),
        }
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `key` holds a live entry. Does not count as a lookup.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }
}

fn format_timestamp(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}
