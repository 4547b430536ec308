//! Cache Statistics Module
//!
//! Tracks cache counters and builds read-only snapshots for the debug
//! endpoint and the client-side cache indicator.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries purged because their TTL elapsed
    pub expirations: u64,
    /// Number of entries removed by explicit invalidation
    pub invalidations: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }
}

// == Entry Stats ==
/// Age and remaining lifetime of one cached entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntryStats {
    /// Display form of the key
    pub key: String,
    /// Seconds since the entry was stored
    pub age_secs: u64,
    /// Seconds until the entry expires, 0 when already stale
    pub expires_in_secs: u64,
    /// Insertion time in RFC 3339
    pub stored_at: String,
}

// == Cache Snapshot ==
/// Point-in-time view of a cache. Building one never changes the cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    /// Live (non-expired) entries
    pub size: usize,
    /// Expired entries not yet purged by access or sweep
    pub pending_expiry: usize,
    /// Per-entry details for live entries, sorted by key
    pub items: Vec<EntryStats>,
    /// Running counters
    pub counters: CacheStats,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
