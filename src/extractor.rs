//! Publisher page content extraction.
//!
//! Each resolved item is matched to a CSS selector by the host of its
//! publisher URL. Hosts missing from the selector table fall back to the
//! default selector when one is configured; with neither, the item is left
//! alone. Pages are fetched concurrently and parsed into an
//! [`ArticleContent`]: page metadata plus the text of every element the
//! selector matches.

use crate::models::{ArticleContent, BatchReport, NewsItem, StageOutcome};
use crate::utils::random_user_agent;
use futures::future::join_all;
use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("link[rel][href]").unwrap());

/// Pick the body selector for `host`.
///
/// Returns `None` when the host is unmapped and there is no default.
pub fn selector_for_host<'a>(
    host: &str,
    selectors: &'a HashMap<String, String>,
    default_selector: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(selector) = selectors.get(host).filter(|s| !s.trim().is_empty()) {
        return Some(selector.as_str());
    }
    let fallback = default_selector.filter(|s| !s.trim().is_empty())?;
    info!(%host, selector = fallback, "No selector for host; using default selector");
    Some(fallback)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `content` of the first `<meta>` whose `attr` equals `key` (case-insensitive).
fn meta_content(document: &Html, attr: &str, key: &str) -> Option<String> {
    document
        .select(&META)
        .filter(|el| {
            el.value()
                .attr(attr)
                .is_some_and(|v| v.eq_ignore_ascii_case(key))
        })
        .find_map(|el| el.value().attr("content").and_then(non_empty))
}

fn og(document: &Html, key: &str) -> Option<String> {
    meta_content(document, "property", key).or_else(|| meta_content(document, "name", key))
}

/// `href` of the first `<link>` whose `rel` list contains `rel`, resolved against `base`.
fn link_href(document: &Html, rel: &str, base: &Url) -> Option<String> {
    document
        .select(&LINK)
        .filter(|el| {
            el.value()
                .attr("rel")
                .is_some_and(|v| v.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case(rel)))
        })
        .find_map(|el| el.value().attr("href").and_then(non_empty))
        .map(|href| base.join(&href).map(|u| u.to_string()).unwrap_or(href))
}

/// Page metadata, with `body` left unset.
pub fn extract_metadata(document: &Html, page_url: &Url) -> ArticleContent {
    let title = og(document, "og:title").or_else(|| {
        document
            .select(&TITLE)
            .next()
            .and_then(|el| non_empty(&el.text().collect::<String>()))
    });

    ArticleContent {
        title,
        canonical_link: link_href(document, "canonical", page_url).or_else(|| og(document, "og:url")),
        image_url: og(document, "og:image"),
        image_width: og(document, "og:image:width").and_then(|w| w.parse().ok()),
        image_height: og(document, "og:image:height").and_then(|h| h.parse().ok()),
        description: og(document, "og:description")
            .or_else(|| meta_content(document, "name", "description")),
        keywords: meta_content(document, "name", "keywords"),
        site_name: og(document, "og:site_name"),
        icon_url: link_href(document, "icon", page_url),
        body: None,
    }
}

/// Element text with runs of whitespace collapsed to single spaces.
fn element_text(element: ElementRef<'_>) -> Option<String> {
    non_empty(&element.text().collect::<String>().split_whitespace().join(" "))
}

/// Text of every element matching `selector`, in document order, one per line.
pub fn extract_body(document: &Html, selector: &Selector) -> Option<String> {
    let parts: Vec<String> = document.select(selector).filter_map(element_text).collect();
    non_empty(&parts.join("\n"))
}

/// Parse `html` into metadata plus selector-matched body text.
pub fn parse_article(html: &str, page_url: &Url, selector: &Selector) -> ArticleContent {
    let document = Html::parse_document(html);
    let mut content = extract_metadata(&document, page_url);
    content.body = extract_body(&document, selector);
    content
}

async fn fetch_article(
    http: &reqwest::Client,
    link: &str,
    selector: &str,
) -> Result<ArticleContent, String> {
    let selector = Selector::parse(selector).map_err(|e| format!("invalid selector {selector:?}: {e}"))?;

    let response = http
        .get(link)
        .header(USER_AGENT, random_user_agent())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| e.to_string())?;
    let page_url = response.url().clone();
    let html = response.text().await.map_err(|e| e.to_string())?;

    let content = parse_article(&html, &page_url, &selector);
    if content.body.is_none() {
        warn!(%page_url, "Selector matched no text");
    }
    Ok(content)
}

#[instrument(level = "debug", skip_all, fields(link = ?item.source_link))]
async fn extract_one(
    item: &mut NewsItem,
    http: &reqwest::Client,
    selectors: &HashMap<String, String>,
    default_selector: Option<&str>,
    cancel: &CancellationToken,
) {
    let Some(link) = item.source_link.clone() else {
        item.content = None;
        item.extraction = StageOutcome::NotAttempted;
        return;
    };
    let Some(host) = item.source_host() else {
        warn!(%link, "Resolved link has no host");
        item.record_extraction(Err(format!("no host in {link}")));
        return;
    };
    let Some(selector) = selector_for_host(&host, selectors, default_selector) else {
        debug!(%host, "No selector for host; skipping extraction");
        item.content = None;
        item.extraction = StageOutcome::NotAttempted;
        return;
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => Err("cancelled".to_string()),
        r = fetch_article(http, &link, selector) => r,
    };
    if let Err(reason) = &result {
        warn!(%link, %reason, "Failed to extract article content");
    }
    item.record_extraction(result);
}

/// Extract content for every resolved item concurrently.
///
/// Items without a resolved link, or whose host has no selector, are
/// skipped. Failures are recorded on the item and never abort the batch.
///
/// # Arguments
/// * `items` - Items to extract; only those with a `source_link` are fetched.
/// * `http` - Client used for every page fetch.
/// * `selectors` - Body selector per publisher host.
/// * `default_selector` - Used for hosts missing from `selectors`.
/// * `cancel` - Cancelling it fails every unfinished fetch with `"cancelled"`.
///
/// # Returns
/// Counts of succeeded, failed and skipped items.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn extract_all(
    items: &mut [NewsItem],
    http: &reqwest::Client,
    selectors: &HashMap<String, String>,
    default_selector: Option<&str>,
    cancel: &CancellationToken,
) -> BatchReport {
    join_all(
        items
            .iter_mut()
            .map(|item| extract_one(item, http, selectors, default_selector, cancel)),
    )
    .await;

    let mut report = BatchReport::default();
    for item in items.iter() {
        report.record(&item.extraction);
    }
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Extracted source contents"
    );
    report
}
