//! Feed retrieval and conversion of RSS entries into [`NewsItem`]s.

use crate::error::{NewsError, Result};
use crate::models::NewsItem;
use crate::utils::{random_user_agent, truncate_for_log};
use chrono::{DateTime, Utc};
use reqwest::header::USER_AGENT;
use tracing::{debug, info, instrument, warn};
use url::Url;

impl From<&rss::Item> for NewsItem {
    fn from(item: &rss::Item) -> Self {
        let source = item.source();
        NewsItem {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().unwrap_or_default().to_string(),
            published: item.pub_date().and_then(parse_timestamp),
            description: item.description().unwrap_or_default().to_string(),
            source_name: source.and_then(|s| s.title()).map(str::to_string),
            source_url: source.map(|s| s.url().to_string()),
            guid: item.guid().map(|g| g.value().to_string()),
            ..Default::default()
        }
    }
}

/// RSS dates are RFC 2822; some feeds slip in RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a feed document into items, keeping the feed's order.
pub fn parse_feed(body: &[u8]) -> Result<Vec<NewsItem>> {
    let channel = rss::Channel::read_from(body).map_err(|e| NewsError::Parse(e.to_string()))?;
    Ok(channel.items().iter().map(NewsItem::from).collect())
}

/// Optionally sort newest first, then cut to `limit` (`0` keeps everything).
///
/// Items without a timestamp sort as the oldest. The sort is stable so ties
/// keep feed order.
pub fn arrange(mut items: Vec<NewsItem>, order: bool, limit: usize) -> Vec<NewsItem> {
    if order {
        items.sort_by(|a, b| b.published.cmp(&a.published));
    }
    if limit > 0 && limit < items.len() {
        items.truncate(limit);
    }
    items
}

/// Fetches and parses aggregator feeds.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// GET `url` with a rotated User-Agent and parse the body as RSS.
    ///
    /// # Arguments
    /// * `url` - Fully composed feed URL.
    ///
    /// # Returns
    /// The feed entries in document order, or `Transport` for network and
    /// non-2xx failures and `Parse` for a body that is not RSS.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &Url) -> Result<Vec<NewsItem>> {
        let user_agent = random_user_agent();
        debug!(user_agent, "Requesting feed");

        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        let items = parse_feed(&body).inspect_err(|e| {
            warn!(
                error = %e,
                body_preview = %truncate_for_log(&String::from_utf8_lossy(&body), 300),
                "Feed body is not a valid RSS document"
            );
        })?;

        info!(count = items.len(), "Fetched feed entries");
        Ok(items)
    }

    /// [`fetch`](Self::fetch) followed by [`arrange`].
    pub async fn fetch_arranged(&self, url: &Url, order: bool, limit: usize) -> Result<Vec<NewsItem>> {
        let items = self.fetch(url).await?;
        Ok(arrange(items, order, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"Politica" - Google News</title>
    <link>https://news.google.com/search?q=Politica</link>
    <description>Google News</description>
    <item>
      <title>El Senado debate el presupuesto - Clarín</title>
      <link>https://news.google.com/rss/articles/CBMiAAA?oc=5</link>
      <guid isPermaLink="false">CBMiAAA</guid>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
      <description>&lt;a href="https://news.google.com/rss/articles/CBMiAAA"&gt;El Senado&lt;/a&gt;</description>
      <source url="https://www.clarin.com">Clarín</source>
    </item>
    <item>
      <title>Sin fecha - La Nación</title>
      <link>https://news.google.com/rss/articles/CBMiBBB?oc=5</link>
      <description>sin fecha</description>
      <source url="https://www.lanacion.com.ar">La Nación</source>
    </item>
    <item>
      <title>Gobernadores reunidos - Infobae</title>
      <link>https://news.google.com/rss/articles/CBMiCCC?oc=5</link>
      <pubDate>Tue, 07 Jan 2025 08:30:00 GMT</pubDate>
      <description>reunión</description>
    </item>
  </channel>
</rss>"#;

    fn item_at(title: &str, hour: Option<u32>) -> NewsItem {
        NewsItem {
            published: hour.map(|h| Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap()),
            ..NewsItem::new(title, format!("https://news.google.com/{title}"))
        }
    }

    #[test]
    fn test_parse_feed_keeps_order_and_fields() {
        let items = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first.title, "El Senado debate el presupuesto - Clarín");
        assert_eq!(first.link, "https://news.google.com/rss/articles/CBMiAAA?oc=5");
        assert_eq!(first.guid.as_deref(), Some("CBMiAAA"));
        assert_eq!(first.source_name.as_deref(), Some("Clarín"));
        assert_eq!(first.source_url.as_deref(), Some("https://www.clarin.com"));
        assert_eq!(
            first.published,
            Some(Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap())
        );
        assert!(first.description.contains("El Senado"));

        assert!(items[1].published.is_none());
        assert!(items[2].source_name.is_none());
        assert!(items.iter().all(|i| i.source_link.is_none()));
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        let result = parse_feed(b"<html><body>not a feed</body></html>");
        assert!(matches!(result, Err(NewsError::Parse(_))));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("Mon, 06 Jan 2025 10:00:00 GMT").is_some());
        assert!(parse_timestamp("2025-01-06T10:00:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_arrange_limit() {
        let items: Vec<_> = (0..15).map(|i| item_at(&format!("n{i}"), Some(i))).collect();
        assert_eq!(arrange(items.clone(), false, 10).len(), 10);
        assert_eq!(arrange(items.clone(), false, 20).len(), 15);
        assert_eq!(arrange(items.clone(), false, 0).len(), 15);

        let kept = arrange(items, false, 3);
        let titles: Vec<_> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["n0", "n1", "n2"]);
    }

    #[test]
    fn test_arrange_orders_newest_first_with_missing_last() {
        let items = vec![
            item_at("mid", Some(5)),
            item_at("none", None),
            item_at("new", Some(9)),
            item_at("old", Some(1)),
        ];
        let sorted = arrange(items, true, 0);
        let titles: Vec<_> = sorted.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["new", "mid", "old", "none"]);
        for pair in sorted.windows(2) {
            assert!(pair[0].published >= pair[1].published);
        }
    }

    #[test]
    fn test_arrange_orders_before_truncating() {
        let items = vec![item_at("a", Some(1)), item_at("b", Some(2)), item_at("c", Some(3))];
        let kept = arrange(items, true, 1);
        assert_eq!(kept[0].title, "c");
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .and(query_param("hl", "es"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_FEED))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/rss/search?hl=es", server.uri())).unwrap();
        let client = FeedClient::new(reqwest::Client::new());
        let items = client.fetch(&url).await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"xml\"}"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/rss", server.uri())).unwrap();
        let result = FeedClient::new(reqwest::Client::new()).fetch(&url).await;
        assert!(matches!(result, Err(NewsError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/rss", server.uri())).unwrap();
        let result = FeedClient::new(reqwest::Client::new()).fetch(&url).await;
        assert!(matches!(result, Err(NewsError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is not served by anything in the test env.
        let url = Url::parse("http://127.0.0.1:9/rss").unwrap();
        let result = FeedClient::new(reqwest::Client::new()).fetch(&url).await;
        assert!(matches!(result, Err(NewsError::Transport(_))));
    }
}
