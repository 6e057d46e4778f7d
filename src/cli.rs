//! Command-line interface for the demo binary.
//!
//! Settings given as flags override those from `--config`.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Fetch news from the aggregator, optionally resolving publisher links and
/// extracting article text.
///
/// ```sh
/// # Top headlines
/// newsapi
///
/// # Search in Spanish/Argentina, last 2 hours, resolve and extract
/// newsapi -q Politica -l es -r AR --period-hours 2 --resolve --extract -c selectors.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("feed").args(["query", "topic", "location"])))]
pub struct Cli {
    /// Free-text search
    #[arg(short, long)]
    pub query: Option<String>,

    /// Topic section (WORLD, NATION, BUSINESS, TECHNOLOGY, ...)
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Location headlines
    #[arg(long)]
    pub location: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Language code, e.g. "es"
    #[arg(short, long)]
    pub language: Option<String>,

    /// Region code, e.g. "AR"
    #[arg(short, long)]
    pub region: Option<String>,

    /// Maximum number of items (0 for no limit)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Only items from the last N hours (search only)
    #[arg(long)]
    pub period_hours: Option<u64>,

    /// Sort newest first
    #[arg(long)]
    pub order: bool,

    /// Resolve aggregator links with headless Chrome
    #[arg(long)]
    pub resolve: bool,

    /// Extract publisher content (implies --resolve)
    #[arg(long)]
    pub extract: bool,

    /// HTTP proxy for feed and publisher requests
    #[arg(long, env = "NEWSAPI_PROXY")]
    pub proxy: Option<url::Url>,
}
