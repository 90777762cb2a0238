//! The core run: cache-or-fetch, then filter and group.
//!
//! Terminating failures are auth, config and whole-fetch network errors;
//! everything else is collected into `warnings` and the run continues.

use chrono::Utc;
use tracing::{info, warn};

use crate::app::Result;
use crate::domain::{CreatorGroup, SummaryResult};
use crate::fetcher::{Credentials, FetchOptions, Fetcher, PageSource};
use crate::filter::{self, FilterOptions};
use crate::store::{cache_key, CacheStore};
use crate::summarizer::{self, SummaryOptions};

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub enabled: bool,
    pub ttl_minutes: i64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: 60,
        }
    }
}

pub struct PipelineOutput {
    pub groups: Vec<CreatorGroup>,
    pub warnings: Vec<String>,
    pub from_cache: bool,
}

/// Produce the filtered per-creator groups for one run.
///
/// The cache is consulted before any network activity; a valid entry skips
/// the fetch entirely. A live fetch writes through to the store under a key
/// derived from the request shape and the authenticated principal.
pub async fn run_pipeline(
    store: &dyn CacheStore,
    source: &dyn PageSource,
    creds: &Credentials,
    fetch_opts: &FetchOptions,
    filter_opts: &FilterOptions,
    cache_opts: &CacheOptions,
    pause: Option<&mut (dyn FnMut(u32) -> bool + Send)>,
) -> Result<PipelineOutput> {
    let key = cache_key(
        &fetch_opts.endpoint,
        &fetch_opts.feed_type,
        fetch_opts.max_pages,
        &creds.principal(),
    );

    let mut warnings: Vec<String> = Vec::new();
    let mut cached = None;
    if cache_opts.enabled {
        match store.get(&key) {
            Ok(Some(entry)) if entry.is_valid(Utc::now()) => {
                info!(posts = entry.posts.len(), "using cached feed");
                cached = Some(entry.posts);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("cache read failed: {e}");
                warnings.push(format!("cache read failed: {e}"));
            }
        }
    }

    let from_cache = cached.is_some();
    let posts = match cached {
        Some(posts) => posts,
        None => {
            let posts = Fetcher::new().fetch(source, fetch_opts, pause).await?;
            if cache_opts.enabled {
                if let Err(e) = store.put(&key, &posts, cache_opts.ttl_minutes) {
                    warn!("cache write failed: {e}");
                    warnings.push(format!("cache write failed: {e}"));
                }
            }
            posts
        }
    };

    let groups = filter::apply(&posts, filter_opts);
    Ok(PipelineOutput {
        groups,
        warnings,
        from_cache,
    })
}

/// Summarize one creator group. Idempotent per identical group and options;
/// provider failures surface as the warning, never as an error.
pub async fn get_summary(
    group: &CreatorGroup,
    opts: &SummaryOptions,
) -> (SummaryResult, Option<String>) {
    summarizer::summarize(group, opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DynlensError;
    use crate::fetcher::RawPage;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct CountingSource {
        served: Mutex<u32>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                served: Mutex::new(0),
            }
        }

        fn served(&self) -> u32 {
            *self.served.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn fetch_page(&self, _offset: &str, _baseline: &str) -> Result<RawPage> {
            *self.served.lock().unwrap() += 1;
            Ok(RawPage {
                items: vec![json!({
                    "id_str": "1",
                    "modules": {
                        "module_author": {"mid": 5, "name": "up", "pub_ts": 1000},
                        "module_dynamic": {
                            "major": {"type": "MAJOR_TYPE_ARCHIVE", "archive": {"title": "t"}}
                        }
                    }
                })],
                offset: String::new(),
                update_baseline: String::new(),
                has_more: false,
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PageSource for FailingSource {
        async fn fetch_page(&self, _offset: &str, _baseline: &str) -> Result<RawPage> {
            Err(DynlensError::Auth("expired".into()))
        }
    }

    fn opts() -> (Credentials, FetchOptions, FilterOptions, CacheOptions) {
        let creds = Credentials {
            sessdata: "s".into(),
            ..Default::default()
        };
        (
            creds,
            FetchOptions {
                request_interval_ms: 0,
                ..Default::default()
            },
            FilterOptions::default(),
            CacheOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_second_run_hits_cache() {
        let store = SqliteStore::in_memory().unwrap();
        let source = CountingSource::new();
        let (creds, fetch, filter, cache) = opts();

        let first = run_pipeline(&store, &source, &creds, &fetch, &filter, &cache, None)
            .await
            .unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.groups.len(), 1);

        let second = run_pipeline(&store, &source, &creds, &fetch, &filter, &cache, None)
            .await
            .unwrap();
        assert!(second.from_cache);
        assert_eq!(second.groups.len(), 1);
        assert_eq!(source.served(), 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_fetches() {
        let store = SqliteStore::in_memory().unwrap();
        let source = CountingSource::new();
        let (creds, fetch, filter, mut cache) = opts();
        cache.enabled = false;

        for _ in 0..2 {
            let out = run_pipeline(&store, &source, &creds, &fetch, &filter, &cache, None)
                .await
                .unwrap();
            assert!(!out.from_cache);
        }
        assert_eq!(source.served(), 2);
    }

    #[tokio::test]
    async fn test_different_principal_misses_cache() {
        let store = SqliteStore::in_memory().unwrap();
        let source = CountingSource::new();
        let (creds, fetch, filter, cache) = opts();

        run_pipeline(&store, &source, &creds, &fetch, &filter, &cache, None)
            .await
            .unwrap();

        let other = Credentials {
            sessdata: "someone-else".into(),
            ..Default::default()
        };
        let out = run_pipeline(&store, &source, &other, &fetch, &filter, &cache, None)
            .await
            .unwrap();
        assert!(!out.from_cache);
        assert_eq!(source.served(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_terminates_run() {
        let store = SqliteStore::in_memory().unwrap();
        let (creds, fetch, filter, cache) = opts();

        let result =
            run_pipeline(&store, &FailingSource, &creds, &fetch, &filter, &cache, None).await;
        assert!(matches!(result, Err(DynlensError::Auth(_))));
    }
}
