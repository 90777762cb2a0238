pub mod commands;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::app::{DynlensError, Result};
use crate::config::{parse_time_input, Config};
use crate::domain::Provider;
use crate::fetcher::{Credentials, FetchOptions};
use crate::filter::{FilterOptions, SortOrder};
use crate::pipeline::CacheOptions;
use crate::summarizer::{ApiMode, SummaryOptions};

#[derive(Parser)]
#[command(name = "dynlens")]
#[command(about = "Followed-creator feed digest with cited summaries", long_about = None)]
pub struct Cli {
    /// Alternate config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// UI language: auto | en-US | zh-CN
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Full browser cookie string
    #[arg(long, global = true)]
    pub cookie: Option<String>,

    /// SESSDATA cookie value
    #[arg(long, global = true)]
    pub sessdata: Option<String>,

    /// DedeUserID cookie value
    #[arg(long, global = true)]
    pub dedeuserid: Option<String>,

    /// bili_jct cookie value
    #[arg(long, global = true)]
    pub bili_jct: Option<String>,

    /// Feed type: all | video | pgc | article
    #[arg(long = "type", global = true)]
    pub feed_type: Option<String>,

    /// Max pages to fetch
    #[arg(long, global = true)]
    pub pages: Option<u32>,

    /// Ask before each page request
    #[arg(long, global = true)]
    pub interactive: bool,

    /// Never ask between pages
    #[arg(long, global = true, conflicts_with = "interactive")]
    pub no_interactive: bool,

    /// Start of the time range, "YYYY-MM-DD" or "YYYY-MM-DD HH:MM" (UTC)
    #[arg(long = "from", global = true)]
    pub time_from: Option<String>,

    /// End of the time range
    #[arg(long = "to", global = true)]
    pub time_to: Option<String>,

    /// Space-separated keyword terms; every term must match
    #[arg(long, global = true)]
    pub keyword: Option<String>,

    /// Order creators by post count: asc | desc
    #[arg(long, global = true)]
    pub sort: Option<String>,

    /// Comma-separated creator ids to keep
    #[arg(long, global = true)]
    pub creators: Option<String>,

    /// Enable the feed cache
    #[arg(long, global = true)]
    pub cache: bool,

    /// Disable the feed cache
    #[arg(long, global = true, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Cache TTL in minutes (0 or negative never expires)
    #[arg(long, global = true)]
    pub cache_ttl: Option<i64>,

    /// Summary provider: local | openai | gemini | custom_openai
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// API mode for OpenAI-compatible providers: chat_completions | responses
    #[arg(long, global = true)]
    pub api_mode: Option<String>,

    /// Summary model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Summary API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Base URL for custom_openai (or an endpoint override)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request a JSON-object response in chat_completions mode
    #[arg(long, global = true)]
    pub json_format: bool,

    /// Don't request a JSON-object response
    #[arg(long, global = true, conflicts_with = "json_format")]
    pub no_json_format: bool,

    /// Extra provider headers as a JSON object string
    #[arg(long, global = true)]
    pub extra_headers: Option<String>,

    /// Max posts enumerated into the summary prompt
    #[arg(long, global = true)]
    pub max_items: Option<usize>,

    /// Summary request timeout in seconds
    #[arg(long, global = true)]
    pub summary_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the feed and list creators
    Fetch {
        /// List rendering: summary | detail
        #[arg(long)]
        view: Option<String>,
    },
    /// Summarize one creator's recent posts
    Summarize {
        /// Creator id (mid) or exact name
        #[arg(long)]
        creator: String,
    },
    /// Launch the TUI
    Tui,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Summary,
    Detail,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(ViewMode::Summary),
            "detail" => Ok(ViewMode::Detail),
            other => Err(format!("unknown view mode: {other}")),
        }
    }
}

/// Fully resolved run settings: config values with CLI overrides applied.
/// Built once, before any network activity, so bad input fails fast.
#[derive(Clone)]
pub struct RunSettings {
    pub creds: Credentials,
    pub fetch: FetchOptions,
    pub filter: FilterOptions,
    pub cache: CacheOptions,
    pub summary: SummaryOptions,
    pub view: ViewMode,
    pub page_size: usize,
    pub interactive: bool,
}

impl Cli {
    pub fn settings(&self, config: &Config) -> Result<RunSettings> {
        let pick = |cli: &Option<String>, cfg: &str| -> String {
            cli.as_deref().unwrap_or(cfg).trim().to_string()
        };

        let creds = Credentials {
            cookie: pick(&self.cookie, &config.auth.cookie),
            sessdata: pick(&self.sessdata, &config.auth.sessdata),
            dedeuserid: pick(&self.dedeuserid, &config.auth.dedeuserid),
            bili_jct: pick(&self.bili_jct, &config.auth.bili_jct),
        };

        let feed_type = pick(&self.feed_type, &config.fetch.feed_type).to_lowercase();
        if !matches!(feed_type.as_str(), "all" | "video" | "pgc" | "article") {
            return Err(DynlensError::Config(format!(
                "unknown feed type: {feed_type}"
            )));
        }

        let time_from = parse_time_input(&pick(&self.time_from, &config.filter.time_from), false)
            .map_err(DynlensError::Config)?;
        let time_to = parse_time_input(&pick(&self.time_to, &config.filter.time_to), true)
            .map_err(DynlensError::Config)?;

        let fetch = FetchOptions {
            feed_type,
            max_pages: self.pages.unwrap_or(config.fetch.pages).max(1),
            time_lower_bound: time_from,
            request_interval_ms: config.fetch.request_interval_ms,
            timeout_seconds: config.fetch.timeout_seconds.max(1),
            endpoint: config.fetch.endpoint.clone(),
            features: config.fetch.features.clone(),
            web_location: config.fetch.web_location.clone(),
        };

        let sort = SortOrder::from_str(&pick(&self.sort, &config.filter.sort))
            .map_err(DynlensError::Config)?;
        let filter = FilterOptions {
            time_from,
            time_to,
            keyword: pick(&self.keyword, &config.filter.keyword),
            creator_ids: parse_creator_list(&pick(&self.creators, &config.filter.creators)),
            sort,
        };

        let cache = CacheOptions {
            enabled: resolve_flag(self.cache, self.no_cache, config.cache.enabled),
            ttl_minutes: self.cache_ttl.unwrap_or(config.cache.ttl_minutes),
        };

        let provider = Provider::from_str(&pick(&self.provider, &config.summary.provider))
            .map_err(DynlensError::Config)?;
        let api_mode = ApiMode::from_str(&pick(&self.api_mode, &config.summary.api_mode))
            .map_err(DynlensError::Config)?;
        let summary = SummaryOptions {
            provider,
            api_mode,
            model: pick(&self.model, &config.summary.model),
            api_key: pick(&self.api_key, &config.summary.api_key),
            base_url: pick(&self.base_url, &config.summary.base_url),
            use_json_format: resolve_flag(
                self.json_format,
                self.no_json_format,
                config.summary.use_json_format,
            ),
            extra_headers: resolve_extra_headers(
                self.extra_headers.as_deref(),
                &config.summary.extra_headers,
            )?,
            max_items: self.max_items.unwrap_or(config.summary.max_items).max(1),
            timeout_seconds: self
                .summary_timeout
                .unwrap_or(config.summary.timeout_seconds)
                .max(1),
        };

        let view = ViewMode::from_str(&config.filter.view).map_err(DynlensError::Config)?;

        Ok(RunSettings {
            creds,
            fetch,
            filter,
            cache,
            summary,
            view,
            page_size: config.fetch.page_size.max(1),
            interactive: resolve_flag(
                self.interactive,
                self.no_interactive,
                config.fetch.interactive,
            ),
        })
    }
}

fn resolve_flag(on: bool, off: bool, default: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        default
    }
}

fn parse_creator_list(raw: &str) -> Option<HashSet<String>> {
    let set: HashSet<String> = raw
        .replace(';', ",")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!set.is_empty()).then_some(set)
}

/// CLI headers replace the config table entirely when given. Anything that
/// isn't a JSON object of strings is a fatal configuration error.
fn resolve_extra_headers(
    cli: Option<&str>,
    from_config: &HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    let Some(raw) = cli.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(from_config.clone());
    };

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| DynlensError::Config(format!("--extra-headers is not valid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| DynlensError::Config("--extra-headers must be a JSON object".into()))?;

    let mut headers = HashMap::new();
    for (k, v) in obj {
        let v = v.as_str().ok_or_else(|| {
            DynlensError::Config(format!("--extra-headers value for '{k}' must be a string"))
        })?;
        headers.insert(k.clone(), v.to_string());
    }
    Ok(headers)
}
