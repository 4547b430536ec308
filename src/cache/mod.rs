//! Cache Module
//!
//! In-memory TTL cache used on both sides of the HTTP boundary: the server
//! caches Drive reads, the client caches server-API reads.

mod clock;
mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{CacheKey, Principal, ResourceKind};
pub use stats::{CacheSnapshot, CacheStats, EntryStats};
pub use store::{FillTicket, SharedCache, TtlCache};

use serde::Serialize;

// == Cache Status ==
/// Whether a read was served from the cache. Decided at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }

    /// Parses the value of an `X-Cache-Status` header.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIT" => Some(CacheStatus::Hit),
            "MISS" => Some(CacheStatus::Miss),
            _ => None,
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_status_parse() {
        assert_eq!(CacheStatus::parse("HIT"), Some(CacheStatus::Hit));
        assert_eq!(CacheStatus::parse(" miss "), Some(CacheStatus::Miss));
        assert_eq!(CacheStatus::parse("stale"), None);
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
    }
}
