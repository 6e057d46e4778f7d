//! Aggregator link resolution.
//!
//! The aggregator's article links redirect through client-side script, so a
//! plain HTTP client never sees the publisher URL. Resolution goes through a
//! [`PageRenderer`] that executes the page and reports where it settled.
//!
//! Every item is resolved concurrently. Each worker holds the only mutable
//! borrow of its item, and [`resolve_all`] returns once every worker has
//! finished, whatever its outcome.

use crate::error::Result;
use crate::models::{BatchReport, NewsItem};
use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A scripted browser capability.
///
/// Implementations must isolate calls from each other: a slow or failing
/// render must not affect any other render in flight.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url`, let its scripts run, and return the URL the page lands on.
    async fn render(&self, url: &str) -> Result<String>;
}

/// Resolve one item through `renderer`, recording the outcome on the item.
#[instrument(level = "debug", skip_all, fields(link = %item.link))]
async fn resolve_one(item: &mut NewsItem, renderer: &dyn PageRenderer, cancel: &CancellationToken) {
    let attempt = async {
        match renderer.render(&item.link).await {
            Ok(landed) => Url::parse(&landed)
                .map(|url| url.to_string())
                .map_err(|e| format!("renderer returned invalid URL {landed:?}: {e}")),
            Err(e) => Err(e.to_string()),
        }
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => Err("cancelled".to_string()),
        r = attempt => r,
    };

    match &result {
        Ok(url) => debug!(source_link = %url, "Resolved aggregator link"),
        Err(reason) => warn!(link = %item.link, %reason, "Failed to resolve aggregator link"),
    }
    item.record_resolution(result);
}

/// Resolve every item's aggregator link concurrently.
///
/// Per-item failures are recorded on the item and never abort the batch.
///
/// # Arguments
/// * `items` - Items to resolve; each one gets `source_link` and `resolution` set.
/// * `renderer` - Browser capability shared by all workers.
/// * `cancel` - Cancelling it fails every unfinished item with `"cancelled"`.
///
/// # Returns
/// Counts of succeeded and failed items, once every worker has finished.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn resolve_all(
    items: &mut [NewsItem],
    renderer: &dyn PageRenderer,
    cancel: &CancellationToken,
) -> BatchReport {
    join_all(
        items
            .iter_mut()
            .map(|item| resolve_one(item, renderer, cancel)),
    )
    .await;

    let mut report = BatchReport::default();
    for item in items.iter() {
        report.record(&item.resolution);
    }
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Resolved source links"
    );
    report
}
