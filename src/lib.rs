//! # newsapi
//!
//! Query a news aggregator's RSS feeds, resolve each item's redirect link to
//! the publisher URL, and extract the article body with a per-publisher CSS
//! selector.
//!
//! ## Pipeline
//!
//! 1. **Compose**: build the feed URL from language, region, query and time
//!    window ([`query`])
//! 2. **Fetch**: download and parse the feed into [`NewsItem`]s, then sort and
//!    truncate ([`feed`])
//! 3. **Resolve** (optional): run each aggregator link through a scripted
//!    browser to find the publisher URL, all items concurrently ([`resolver`])
//! 4. **Extract** (optional): fetch each publisher page and pull metadata and
//!    body text, all items concurrently ([`extractor`])
//!
//! Steps 3 and 4 never fail as a whole: each item records its own
//! [`StageOutcome`].

#[cfg(feature = "chrome")]
pub mod browser;
pub mod config;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod models;
pub mod newsapi;
pub mod query;
pub mod resolver;
pub mod utils;

pub use config::{MAX_SEARCH_RESULTS, ProxySetting, QueryConfig, TOPICS};
pub use error::{NewsError, Result};
pub use models::{ArticleContent, BatchReport, NewsItem, StageOutcome};
pub use newsapi::NewsApi;
pub use resolver::PageRenderer;
