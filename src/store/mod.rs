pub mod sqlite;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::app::Result;
use crate::domain::Post;

pub use sqlite::SqliteStore;

/// One cached fetch result. The payload is the normalized post list; it
/// round-trips losslessly through serde.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub fetched_at: DateTime<Utc>,
    pub ttl_minutes: i64,
    pub posts: Vec<Post>,
}

impl CacheEntry {
    /// `ttl_minutes <= 0` means the entry never expires.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.ttl_minutes <= 0 || now < self.fetched_at + Duration::minutes(self.ttl_minutes)
    }
}

pub trait CacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    /// Fully replaces any prior entry for `key`.
    fn put(&self, key: &str, posts: &[Post], ttl_minutes: i64) -> Result<()>;
}

/// Derive the cache key from the request shape: two runs share an entry only
/// if they hit the same endpoint with the same feed type and page extent as
/// the same authenticated principal.
pub fn cache_key(endpoint: &str, feed_type: &str, max_pages: u32, principal: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b"|");
    hasher.update(feed_type.as_bytes());
    hasher.update(b"|");
    hasher.update(max_pages.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(principal.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl_minutes: i64) -> CacheEntry {
        CacheEntry {
            key: "k".into(),
            fetched_at: Utc::now(),
            ttl_minutes,
            posts: Vec::new(),
        }
    }

    #[test]
    fn test_ttl_boundary() {
        let e = entry(60);
        assert!(e.is_valid(e.fetched_at + Duration::minutes(59)));
        assert!(!e.is_valid(e.fetched_at + Duration::minutes(60)));
        assert!(!e.is_valid(e.fetched_at + Duration::minutes(61)));
    }

    #[test]
    fn test_zero_or_negative_ttl_never_expires() {
        for ttl in [0, -5] {
            let e = entry(ttl);
            assert!(e.is_valid(e.fetched_at + Duration::days(3650)));
        }
    }

    #[test]
    fn test_cache_key_sensitivity() {
        let base = cache_key("https://api.example.com/feed", "all", 5, "sess-a");
        assert_eq!(
            base,
            cache_key("https://api.example.com/feed", "all", 5, "sess-a")
        );
        assert_ne!(
            base,
            cache_key("https://api.example.com/feed", "video", 5, "sess-a")
        );
        assert_ne!(
            base,
            cache_key("https://api.example.com/feed", "all", 6, "sess-a")
        );
        assert_ne!(
            base,
            cache_key("https://api.example.com/feed", "all", 5, "sess-b")
        );
    }
}
