//! Configuration management.
//!
//! Configuration is read from `~/.config/dynlens/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields merge with defaults; CLI flags override config
//! values field by field.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// UI language: `auto`, `en-US` or `zh-CN`.
    pub lang: String,
    pub auth: AuthConfig,
    pub fetch: FetchConfig,
    pub filter: FilterConfig,
    pub cache: CacheConfig,
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Full browser cookie string; the individual fields below fill in
    /// anything it lacks.
    pub cookie: String,
    pub sessdata: String,
    pub dedeuserid: String,
    pub bili_jct: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// `all`, `video`, `pgc` or `article`.
    pub feed_type: String,
    pub pages: u32,
    pub page_size: usize,
    /// Ask before each page request.
    pub interactive: bool,
    pub timeout_seconds: u64,
    pub request_interval_ms: u64,
    pub endpoint: String,
    pub features: String,
    pub web_location: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            feed_type: "all".into(),
            pages: 3,
            page_size: 10,
            interactive: false,
            timeout_seconds: 10,
            request_interval_ms: 500,
            endpoint: crate::fetcher::DEFAULT_ENDPOINT.into(),
            features: crate::fetcher::DEFAULT_FEATURES.into(),
            web_location: crate::fetcher::DEFAULT_WEB_LOCATION.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Group ordering by post count: `asc` or `desc`.
    pub sort: String,
    /// List rendering: `summary` or `detail`.
    pub view: String,
    pub keyword: String,
    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM`, UTC.
    pub time_from: String,
    pub time_to: String,
    /// Comma-separated creator ids; empty means all followed creators.
    pub creators: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sort: "desc".into(),
            view: "summary".into(),
            keyword: String::new(),
            time_from: String::new(),
            time_to: String::new(),
            creators: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// `0` or negative means entries never expire.
    pub ttl_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// `local`, `openai`, `gemini` or `custom_openai`.
    pub provider: String,
    /// `chat_completions` or `responses`.
    pub api_mode: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub use_json_format: bool,
    pub extra_headers: HashMap<String, String>,
    pub max_items: usize,
    pub timeout_seconds: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: "local".into(),
            api_mode: "chat_completions".into(),
            model: String::new(),
            api_key: String::new(),
            base_url: String::new(),
            use_json_format: true,
            extra_headers: HashMap::new(),
            max_items: 80,
            timeout_seconds: 45,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lang: "auto".into(),
            auth: AuthConfig::default(),
            fetch: FetchConfig::default(),
            filter: FilterConfig::default(),
            cache: CacheConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// `~/.config/dynlens/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("dynlens").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# dynlens configuration
#
# CLI flags override anything set here.

# UI language: auto | en-US | zh-CN
lang = "auto"

[auth]
# Full browser cookie string copied from a logged-in session. The individual
# fields below fill in anything the cookie string lacks.
cookie = ""
sessdata = ""
dedeuserid = ""
bili_jct = ""

[fetch]
# Feed type: all | video | pgc | article
feed_type = "all"
# Maximum pages to walk per run
pages = 3
# Posts per page in detail view
page_size = 10
# Ask before each page request
interactive = false
timeout_seconds = 10
# Politeness delay between page requests
request_interval_ms = 500

[filter]
# Order creators by post count: asc | desc
sort = "desc"
# List rendering: summary | detail
view = "summary"
# Space-separated terms; every term must match
keyword = ""
# UTC, "YYYY-MM-DD" or "YYYY-MM-DD HH:MM"
time_from = ""
time_to = ""
# Comma-separated creator ids; empty means all followed creators
creators = ""

[cache]
enabled = true
# 0 or negative means entries never expire
ttl_minutes = 60

[summary]
# Provider: local | openai | gemini | custom_openai
provider = "local"
# API mode for OpenAI-compatible providers: chat_completions | responses
api_mode = "chat_completions"
model = ""
api_key = ""
# Required for custom_openai; optional endpoint override otherwise
base_url = ""
# Request a JSON-object response in chat_completions mode
use_json_format = true
# How many posts to enumerate into the prompt
max_items = 80
timeout_seconds = 45

# Extra HTTP headers merged into provider requests:
# [summary.extra_headers]
# "X-Title" = "dynlens"
"##
        .to_string()
    }
}

/// Parse a user-supplied time bound. A bare date means start-of-day for the
/// lower bound and end-of-day for the upper one.
pub fn parse_time_input(text: &str, is_end: bool) -> Result<Option<DateTime<Utc>>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M") {
        return Ok(Some(dt.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let time = if is_end {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return Ok(time.map(|dt| dt.and_utc()));
    }

    Err(format!(
        "invalid time '{text}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM"
    ))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
