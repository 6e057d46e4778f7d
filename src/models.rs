//! Data models threaded through the pipeline.
//!
//! - [`NewsItem`]: one article surfaced by a query, filled in stage by stage
//! - [`ArticleContent`]: what the extractor pulled off the publisher page
//! - [`StageOutcome`]: per-item result of the resolve and extract passes
//! - [`BatchReport`]: tallies returned by a batch pass

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one pipeline stage for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StageOutcome {
    #[default]
    NotAttempted,
    Succeeded,
    Failed(String),
}

impl StageOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, StageOutcome::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// Metadata and body text extracted from a publisher page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub title: Option<String>,
    pub canonical_link: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub site_name: Option<String>,
    pub icon_url: Option<String>,
    /// Text of every element matching the host's selector, in document order.
    pub body: Option<String>,
}

/// A news article surfaced by a feed query.
///
/// The feed fields are set when the item is built. `source_link` is written
/// by the link resolver and `content` by the content extractor, through
/// [`record_resolution`](Self::record_resolution) and
/// [`record_extraction`](Self::record_extraction), which keep `content`
/// empty for any item without a resolved link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// Aggregator redirect link.
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub description: String,
    /// Publisher name as reported by the feed.
    pub source_name: Option<String>,
    /// Publisher home page as reported by the feed.
    pub source_url: Option<String>,
    pub guid: Option<String>,

    /// Publisher URL the aggregator link redirects to.
    pub source_link: Option<String>,
    pub resolution: StageOutcome,

    pub content: Option<ArticleContent>,
    pub extraction: StageOutcome,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// Host of the resolved publisher URL, if there is one and it parses.
    pub fn source_host(&self) -> Option<String> {
        self.source_link
            .as_deref()
            .and_then(|link| url::Url::parse(link).ok())
            .and_then(|url| url.host_str().map(str::to_string))
    }

    pub fn record_resolution(&mut self, result: Result<String, String>) {
        // Content extracted from an earlier link no longer belongs to this item.
        self.content = None;
        self.extraction = StageOutcome::NotAttempted;
        match result {
            Ok(url) => {
                self.source_link = Some(url);
                self.resolution = StageOutcome::Succeeded;
            }
            Err(reason) => {
                self.source_link = None;
                self.resolution = StageOutcome::Failed(reason);
            }
        }
    }

    /// Store the extractor's result. Ignored for items without a resolved link.
    pub fn record_extraction(&mut self, result: Result<ArticleContent, String>) {
        if self.source_link.is_none() {
            self.content = None;
            self.extraction = StageOutcome::NotAttempted;
            return;
        }
        match result {
            Ok(content) => {
                self.content = Some(content);
                self.extraction = StageOutcome::Succeeded;
            }
            Err(reason) => {
                self.content = None;
                self.extraction = StageOutcome::Failed(reason);
            }
        }
    }
}

/// Per-batch tallies for a resolve or extract pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &StageOutcome) {
        match outcome {
            StageOutcome::Succeeded => self.succeeded += 1,
            StageOutcome::Failed(_) => self.failed += 1,
            StageOutcome::NotAttempted => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}
