//! Query configuration, the known topic set, HTTP proxy selection and the
//! optional YAML configuration file used by the demo binary.
//!
//! A [`QueryConfig`] is an ordinary value. Each `with_*`/`without_*` method
//! consumes it and returns the updated copy, so a configuration is built by
//! applying a sequence of named overrides:
//!
//! ```ignore
//! let config = QueryConfig::default()
//!     .with_language("es")
//!     .with_region("AR")
//!     .with_limit(10)
//!     .with_period(Duration::from_secs(2 * 3600));
//! ```

use crate::error::{NewsError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Hard cap on the number of items a query may return.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Topic sections the aggregator publishes headline feeds for.
pub const TOPICS: [&str; 8] = [
    "WORLD",
    "NATION",
    "BUSINESS",
    "TECHNOLOGY",
    "ENTERTAINMENT",
    "SPORTS",
    "SCIENCE",
    "HEALTH",
];

/// Validate a topic case-insensitively and return its canonical upper-case form.
pub fn normalize_topic(topic: &str) -> Result<String> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(NewsError::InvalidArgument("topic must not be empty".into()));
    }
    let upper = trimmed.to_uppercase();
    if TOPICS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(NewsError::InvalidArgument(format!("unknown topic: {topic}")))
    }
}

/// Everything that shapes a query and the passes that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub language: String,
    pub region: String,
    /// Maximum number of items returned; `0` disables truncation.
    pub limit: usize,
    /// Sort newest first before truncating.
    pub order: bool,
    pub period: Option<Duration>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Publisher host (as it appears in the resolved URL) to body selector.
    pub selectors: HashMap<String, String>,
    /// Used for hosts missing from `selectors`.
    pub default_selector: Option<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            region: "US".to_string(),
            limit: 10,
            order: false,
            period: None,
            start_date: None,
            end_date: None,
            selectors: HashMap::new(),
            default_selector: None,
        }
    }
}

impl QueryConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the result limit, clamped to [`MAX_SEARCH_RESULTS`].
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_SEARCH_RESULTS);
        self
    }

    pub fn with_order(mut self, order: bool) -> Self {
        self.order = order;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    pub fn without_period(mut self) -> Self {
        self.period = None;
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn without_start_date(mut self) -> Self {
        self.start_date = None;
        self
    }

    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn without_end_date(mut self) -> Self {
        self.end_date = None;
        self
    }

    /// Drop the period and both explicit dates.
    pub fn without_time_window(mut self) -> Self {
        self.period = None;
        self.start_date = None;
        self.end_date = None;
        self
    }

    /// Replace the whole selector table.
    pub fn with_selectors(mut self, selectors: HashMap<String, String>) -> Self {
        self.selectors = selectors;
        self
    }

    /// Add or replace the selector for a single host.
    pub fn with_selector(mut self, host: impl Into<String>, selector: impl Into<String>) -> Self {
        self.selectors.insert(host.into(), selector.into());
        self
    }

    /// An empty selector clears the fallback.
    pub fn with_default_selector(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        self.default_selector = if selector.trim().is_empty() {
            None
        } else {
            Some(selector)
        };
        self
    }
}

/// Which proxy the shared HTTP client goes through.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProxySetting {
    /// reqwest's default: honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    #[default]
    System,
    /// Never use a proxy, environment included.
    Direct,
    Custom(Url),
}

/// Build the HTTP client used for both feed and publisher requests.
pub fn build_http_client(proxy: &ProxySetting) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder();
    let builder = match proxy {
        ProxySetting::System => builder,
        ProxySetting::Direct => builder.no_proxy(),
        ProxySetting::Custom(url) => builder.proxy(reqwest::Proxy::all(url.as_str())?),
    };
    Ok(builder.build()?)
}

/// On-disk configuration for the demo binary.
///
/// ```yaml
/// language: es
/// region: AR
/// limit: 10
/// period_hours: 2
/// default_selector: body
/// selectors:
///   www.clarin.com: "#storyBody"
///   www.infobae.com: .body-article
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub language: Option<String>,
    pub region: Option<String>,
    pub limit: Option<usize>,
    pub order: Option<bool>,
    pub period_hours: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub selectors: HashMap<String, String>,
    pub default_selector: Option<String>,
    pub proxy: Option<Url>,
}

impl FileConfig {
    /// Layer the file's settings on top of `base`.
    pub fn apply(self, base: QueryConfig) -> QueryConfig {
        let mut config = base;
        if let Some(language) = self.language {
            config = config.with_language(language);
        }
        if let Some(region) = self.region {
            config = config.with_region(region);
        }
        if let Some(limit) = self.limit {
            config = config.with_limit(limit);
        }
        if let Some(order) = self.order {
            config = config.with_order(order);
        }
        if let Some(hours) = self.period_hours {
            config = config.with_period(Duration::from_secs(hours * 3600));
        }
        if let Some(date) = self.start_date {
            config = config.with_start_date(date);
        }
        if let Some(date) = self.end_date {
            config = config.with_end_date(date);
        }
        if !self.selectors.is_empty() {
            config = config.with_selectors(self.selectors);
        }
        if let Some(selector) = self.default_selector {
            config = config.with_default_selector(selector);
        }
        config
    }

    pub fn proxy_setting(&self) -> ProxySetting {
        match &self.proxy {
            Some(url) => ProxySetting::Custom(url.clone()),
            None => ProxySetting::System,
        }
    }
}

/// Read and parse a YAML configuration file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)?;
    let config: FileConfig = serde_yaml::from_str(&raw)?;
    debug!(selectors = config.selectors.len(), "Loaded config file");
    Ok(config)
}
