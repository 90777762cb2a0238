//! # Dynlens
//!
//! A terminal client for the followed-creator dynamic feed: fetch, cache,
//! filter, and summarize with sentence-level citations.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Cache Store
//!                          │
//!                          ▼
//!            Filter & Aggregation → CreatorGroups
//!                          │
//!                          ▼
//!          Summarizer (provider or local fallback)
//! ```
//!
//! - [`fetcher`]: cookie-authenticated paginated retrieval with stop heuristics
//! - [`normalizer`]: untyped upstream JSON to [`domain::Post`] records
//! - [`store`]: TTL-bounded sqlite cache for fetched feeds
//! - [`filter`]: time/keyword filtering and per-creator grouping
//! - [`summarizer`]: multi-provider summaries with citation mapping
//! - [`pipeline`]: the run entry points tying the above together
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch and list creators
//! dynlens --sessdata <value> fetch
//!
//! # Summarize one creator with the configured provider
//! dynlens summarize --creator 12345
//!
//! # Launch the TUI
//! dynlens tui
//! ```

/// Application context and error handling.
pub mod app;

/// Command-line interface using clap.
///
/// Subcommands:
/// - `fetch` - Fetch the feed and list creators
/// - `summarize --creator <id>` - Summarize one creator's recent posts
/// - `tui` - Launch the TUI
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/dynlens/config.toml`; CLI flags override
/// individual values.
pub mod config;

/// Core domain models.
///
/// - [`domain::Post`]: one normalized feed item
/// - [`domain::CreatorGroup`]: a creator's filtered posts, newest first
/// - [`domain::SummaryResult`]: generated sentences with citations
pub mod domain;

/// Paginated feed retrieval.
///
/// - [`fetcher::PageSource`]: async trait for one page request
/// - [`fetcher::HttpPageSource`]: reqwest-based implementation
/// - [`fetcher::Fetcher`]: the sequential pagination loop
pub mod fetcher;

/// Time-range, keyword and creator filtering plus per-creator grouping.
pub mod filter;

/// Embedded language packs.
pub mod i18n;

/// Feed page normalization and deduplication.
pub mod normalizer;

/// The core run: cache-or-fetch, filter, and summary entry points.
pub mod pipeline;

/// TTL-bounded cache persistence.
///
/// - [`store::CacheStore`]: trait defining cache operations
/// - [`store::SqliteStore`]: sqlite implementation
pub mod store;

/// Provider-agnostic summarization with citation mapping and the
/// deterministic local fallback.
pub mod summarizer;

/// Terminal user interface built with ratatui.
///
/// Three-pane layout: creators, posts, preview/summary. Keybindings:
/// j/k navigate, Tab cycles panes, s summarizes, o opens in browser,
/// R refreshes, q quits.
pub mod tui;
