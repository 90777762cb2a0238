pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::Post;
use crate::normalizer::Normalizer;

pub use http::HttpPageSource;

pub const DEFAULT_ENDPOINT: &str =
    "https://api.bilibili.com/x/polymer/web-dynamic/v1/feed/all";
pub const DEFAULT_FEATURES: &str = "itemOpusStyle,listOnlyfans,opusBigCover,onlyfansVote";
pub const DEFAULT_WEB_LOCATION: &str = "333.1365";

/// Everything one fetch run needs to know, passed explicitly per call.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Upstream feed type filter: `all`, `video`, `pgc` or `article`.
    pub feed_type: String,
    pub max_pages: u32,
    /// Posts older than this can't appear on later pages, so pagination
    /// stops once a page dips below it.
    pub time_lower_bound: Option<DateTime<Utc>>,
    /// Politeness delay between page requests.
    pub request_interval_ms: u64,
    pub timeout_seconds: u64,
    pub endpoint: String,
    pub features: String,
    pub web_location: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            feed_type: "all".into(),
            max_pages: 3,
            time_lower_bound: None,
            request_interval_ms: 500,
            timeout_seconds: 10,
            endpoint: DEFAULT_ENDPOINT.into(),
            features: DEFAULT_FEATURES.into(),
            web_location: DEFAULT_WEB_LOCATION.into(),
        }
    }
}

/// One raw feed page plus the cursors needed to request the next one.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub items: Vec<Value>,
    pub offset: String,
    pub update_baseline: String,
    pub has_more: bool,
}

/// Abstracts one page request against the upstream feed API. The upstream is
/// page-indexed newest-first with no random access, so this is the only
/// operation a source needs.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, offset: &str, update_baseline: &str) -> Result<RawPage>;
}

/// Cookie material for the upstream API. `cookie` may be a full browser
/// cookie string; the individual fields fill in anything it lacks.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub cookie: String,
    pub sessdata: String,
    pub dedeuserid: String,
    pub bili_jct: String,
}

impl Credentials {
    /// Assemble the Cookie header, letting explicit fields take effect only
    /// when the cookie string doesn't already carry them.
    pub fn cookie_header(&self) -> String {
        let mut pairs = parse_cookie_string(&self.cookie);
        let mut ensure = |name: &str, value: &str| {
            if !value.is_empty() && !pairs.iter().any(|(k, _)| k == name) {
                pairs.push((name.to_string(), value.to_string()));
            }
        };
        ensure("SESSDATA", &self.sessdata);
        ensure("DedeUserID", &self.dedeuserid);
        ensure("bili_jct", &self.bili_jct);

        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_empty(&self) -> bool {
        self.cookie_header().is_empty()
    }

    /// Identity used in the cache key so two accounts never share an entry.
    pub fn principal(&self) -> String {
        let pairs = parse_cookie_string(&self.cookie);
        pairs
            .into_iter()
            .find(|(k, _)| k == "SESSDATA")
            .map(|(_, v)| v)
            .or_else(|| (!self.sessdata.is_empty()).then(|| self.sessdata.clone()))
            .unwrap_or_else(|| self.cookie.clone())
    }
}

fn parse_cookie_string(cookie: &str) -> Vec<(String, String)> {
    cookie
        .split(';')
        .filter_map(|part| {
            let (k, v) = part.split_once('=')?;
            let k = k.trim();
            if k.is_empty() {
                return None;
            }
            Some((k.to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Drives the sequential pagination loop over a [`PageSource`] and produces
/// the deduplicated, normalized post list.
pub struct Fetcher {
    normalizer: Normalizer,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(),
        }
    }

    /// Fetch pages until one of the stop conditions hits: `max_pages`
    /// reached, the upstream reports no more pages, the oldest post on the
    /// current page predates `time_lower_bound`, or the pause callback
    /// declines to continue.
    ///
    /// The lower-bound stop trusts the feed to be reverse-chronological; a
    /// pinned old item on an early page can end pagination before
    /// `max_pages`. Known limitation.
    ///
    /// Any page failure aborts the whole fetch. Callers get an error, never
    /// a short list indistinguishable from "no more data".
    pub async fn fetch(
        &self,
        source: &dyn PageSource,
        opts: &FetchOptions,
        mut pause: Option<&mut (dyn FnMut(u32) -> bool + Send)>,
    ) -> Result<Vec<Post>> {
        let mut collected: Vec<Post> = Vec::new();
        let mut offset = String::new();
        let mut baseline = String::new();

        for page in 1..=opts.max_pages {
            let raw = source.fetch_page(&offset, &baseline).await?;
            let posts = self.normalizer.normalize_page(&raw.items);
            let oldest = posts.iter().map(|p| p.publish_time).min();

            info!(page, items = posts.len(), has_more = raw.has_more, "fetched feed page");
            collected.extend(posts);

            offset = raw.offset;
            if !raw.update_baseline.is_empty() {
                baseline = raw.update_baseline;
            }

            if !raw.has_more {
                break;
            }
            if let (Some(bound), Some(oldest)) = (opts.time_lower_bound, oldest) {
                if oldest < bound {
                    debug!(page, "oldest post predates the lower time bound, stopping");
                    break;
                }
            }
            if page >= opts.max_pages {
                break;
            }
            if let Some(cb) = pause.as_deref_mut() {
                if !cb(page + 1) {
                    debug!(page, "fetch stopped by pause signal");
                    break;
                }
            }
            if opts.request_interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(opts.request_interval_ms)).await;
            }
        }

        Ok(self.normalizer.dedup(collected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DynlensError;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;

    fn item(id: &str, ts: i64) -> Value {
        json!({
            "id_str": id,
            "modules": {
                "module_author": {"mid": 1, "name": "up", "pub_ts": ts},
                "module_dynamic": {
                    "major": {"type": "MAJOR_TYPE_ARCHIVE", "archive": {"title": id}}
                }
            }
        })
    }

    /// Serves a scripted list of pages, counting how many were requested.
    struct ScriptedSource {
        pages: Vec<RawPage>,
        served: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<RawPage>) -> Self {
            Self {
                pages,
                served: Mutex::new(0),
            }
        }

        fn served(&self) -> usize {
            *self.served.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, _offset: &str, _baseline: &str) -> Result<RawPage> {
            let mut served = self.served.lock().unwrap();
            let page = self
                .pages
                .get(*served)
                .cloned()
                .ok_or_else(|| DynlensError::Api {
                    code: -352,
                    message: "no page scripted".into(),
                })?;
            *served += 1;
            Ok(page)
        }
    }

    fn page(ids_ts: &[(&str, i64)], has_more: bool) -> RawPage {
        RawPage {
            items: ids_ts.iter().map(|(id, ts)| item(id, *ts)).collect(),
            offset: "next".into(),
            update_baseline: String::new(),
            has_more,
        }
    }

    fn opts(max_pages: u32) -> FetchOptions {
        FetchOptions {
            max_pages,
            request_interval_ms: 0,
            ..FetchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_stops_at_max_pages() {
        let source = ScriptedSource::new(vec![
            page(&[("a", 300)], true),
            page(&[("b", 200)], true),
            page(&[("c", 100)], true),
        ]);
        let posts = Fetcher::new().fetch(&source, &opts(2), None).await.unwrap();
        assert_eq!(source.served(), 2);
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_stops_when_no_more_pages() {
        let source = ScriptedSource::new(vec![
            page(&[("a", 300)], true),
            page(&[("b", 200)], false),
        ]);
        let posts = Fetcher::new().fetch(&source, &opts(10), None).await.unwrap();
        assert_eq!(source.served(), 2);
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_stops_past_time_lower_bound() {
        // Page 3's oldest post predates the bound; pages 4+ must not be hit
        // even with max_pages = 10.
        let bound = Utc.timestamp_opt(250, 0).unwrap();
        let source = ScriptedSource::new(vec![
            page(&[("a", 400)], true),
            page(&[("b", 300)], true),
            page(&[("c", 260), ("d", 200)], true),
            page(&[("e", 100)], true),
        ]);
        let mut o = opts(10);
        o.time_lower_bound = Some(bound);

        let posts = Fetcher::new().fetch(&source, &o, None).await.unwrap();
        assert_eq!(source.served(), 3);
        assert_eq!(posts.len(), 4);
    }

    #[tokio::test]
    async fn test_page_failure_aborts_whole_fetch() {
        let source = ScriptedSource::new(vec![page(&[("a", 300)], true)]);
        // Second page is unscripted and errors; the whole fetch must error.
        let result = Fetcher::new().fetch(&source, &opts(5), None).await;
        assert!(matches!(result, Err(DynlensError::Api { .. })));
    }

    #[tokio::test]
    async fn test_pause_signal_stops_before_next_page() {
        let source = ScriptedSource::new(vec![
            page(&[("a", 300)], true),
            page(&[("b", 200)], true),
        ]);
        let mut decline = |_page: u32| false;
        let posts = Fetcher::new()
            .fetch(&source, &opts(5), Some(&mut decline))
            .await
            .unwrap();
        assert_eq!(source.served(), 1);
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_cross_page_dedup_first_wins() {
        let source = ScriptedSource::new(vec![
            page(&[("a", 300), ("b", 290)], true),
            page(&[("b", 290), ("c", 280)], false),
        ]);
        let posts = Fetcher::new().fetch(&source, &opts(5), None).await.unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cookie_header_assembly() {
        let creds = Credentials {
            cookie: "SESSDATA=abc; other=1".into(),
            sessdata: "ignored".into(),
            dedeuserid: "42".into(),
            bili_jct: "csrf".into(),
        };
        let header = creds.cookie_header();
        assert!(header.contains("SESSDATA=abc"));
        assert!(!header.contains("ignored"));
        assert!(header.contains("DedeUserID=42"));
        assert!(header.contains("bili_jct=csrf"));
    }

    #[test]
    fn test_principal_prefers_sessdata() {
        let creds = Credentials {
            cookie: "SESSDATA=abc; other=1".into(),
            ..Default::default()
        };
        assert_eq!(creds.principal(), "abc");

        let bare = Credentials {
            sessdata: "direct".into(),
            ..Default::default()
        };
        assert_eq!(bare.principal(), "direct");
    }
}
