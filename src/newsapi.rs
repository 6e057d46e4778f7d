//! The caller-facing entry point.
//!
//! [`NewsApi`] owns a [`QueryConfig`], the shared HTTP client and, when link
//! resolution is wanted, a [`PageRenderer`]. Queries compose the feed URL and
//! fetch it; resolving and extracting are separate passes the caller runs
//! afterwards if it needs them.
//!
//! ```ignore
//! let api = NewsApi::with_config(QueryConfig::default().with_language("es").with_region("AR"))?
//!     .with_renderer(Arc::new(ChromeRenderer::launch(BrowserSettings::default()).await?));
//! let mut items = api.search_news("Politica").await?;
//! api.resolve_sources(&mut items).await?;
//! api.extract_contents(&mut items).await;
//! ```

use crate::config::{ProxySetting, QueryConfig, build_http_client, normalize_topic};
use crate::error::{NewsError, Result};
use crate::extractor::extract_all;
use crate::feed::FeedClient;
use crate::models::{BatchReport, NewsItem};
use crate::query::compose_url;
use crate::resolver::{PageRenderer, resolve_all};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://news.google.com/";

pub struct NewsApi {
    config: QueryConfig,
    proxy: ProxySetting,
    http: reqwest::Client,
    base_url: Url,
    renderer: Option<Arc<dyn PageRenderer>>,
    cancel: CancellationToken,
}

impl fmt::Debug for NewsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsApi")
            .field("config", &self.config)
            .field("proxy", &self.proxy)
            .field("base_url", &self.base_url.as_str())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl NewsApi {
    /// Default configuration and the system proxy.
    pub fn new() -> Result<Self> {
        Self::with_config(QueryConfig::default())
    }

    pub fn with_config(config: QueryConfig) -> Result<Self> {
        let proxy = ProxySetting::default();
        Ok(Self {
            config,
            http: build_http_client(&proxy)?,
            proxy,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            renderer: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Rebuild the HTTP client for `proxy`. The most recent call wins.
    pub fn with_proxy_setting(mut self, proxy: ProxySetting) -> Result<Self> {
        self.http = build_http_client(&proxy)?;
        self.proxy = proxy;
        Ok(self)
    }

    pub fn with_proxy(self, proxy: Url) -> Result<Self> {
        self.with_proxy_setting(ProxySetting::Custom(proxy))
    }

    /// Connect directly, ignoring any proxy in the environment.
    pub fn without_proxy(self) -> Result<Self> {
        self.with_proxy_setting(ProxySetting::Direct)
    }

    pub fn with_system_proxy(self) -> Result<Self> {
        self.with_proxy_setting(ProxySetting::System)
    }

    /// Point queries at another aggregator root.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Cancelling `token` aborts the in-flight fetch and every batch worker.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut QueryConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: QueryConfig) {
        self.config = config;
    }

    /// Apply a sequence of overrides between runs.
    pub fn configure(&mut self, apply: impl FnOnce(QueryConfig) -> QueryConfig) {
        self.config = apply(std::mem::take(&mut self.config));
    }

    pub fn proxy(&self) -> &ProxySetting {
        &self.proxy
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Headlines for the configured region and language.
    pub async fn top_news(&self) -> Result<Vec<NewsItem>> {
        self.get_news("/rss", "").await
    }

    /// Headlines for a location, e.g. a city or country name.
    pub async fn location_news(&self, location: &str) -> Result<Vec<NewsItem>> {
        let location = location.trim();
        if location.is_empty() {
            return Err(NewsError::InvalidArgument("location must not be empty".into()));
        }
        self.get_news(&format!("rss/headlines/section/geo/{location}"), "")
            .await
    }

    /// Headlines for one of [`TOPICS`](crate::config::TOPICS), matched case-insensitively.
    pub async fn topic_news(&self, topic: &str) -> Result<Vec<NewsItem>> {
        let topic = normalize_topic(topic)?;
        self.get_news(&format!("rss/headlines/section/topic/{topic}"), "")
            .await
    }

    /// Free-text search, narrowed by the configured time window.
    pub async fn search_news(&self, query: &str) -> Result<Vec<NewsItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(NewsError::InvalidArgument("query must not be empty".into()));
        }
        self.get_news("rss/search", query).await
    }

    #[instrument(level = "info", skip(self))]
    async fn get_news(&self, path: &str, query: &str) -> Result<Vec<NewsItem>> {
        let url = compose_url(&self.base_url, path, query, &self.config);
        info!(%url, "Fetching news feed");

        let client = FeedClient::new(self.http.clone());
        tokio::select! {
            _ = self.cancel.cancelled() => Err(NewsError::Cancelled),
            r = client.fetch_arranged(&url, self.config.order, self.config.limit) => r,
        }
    }

    /// Resolve every item's aggregator link to its publisher URL.
    ///
    /// Fails only when no renderer is configured; per-item failures are
    /// recorded on the items.
    pub async fn resolve_sources(&self, items: &mut [NewsItem]) -> Result<BatchReport> {
        let renderer = self
            .renderer
            .as_deref()
            .ok_or_else(|| NewsError::Config("no page renderer configured".into()))?;
        Ok(resolve_all(items, renderer, &self.cancel).await)
    }

    /// Extract publisher content for every resolved item using the
    /// configured selector table and default selector.
    pub async fn extract_contents(&self, items: &mut [NewsItem]) -> BatchReport {
        extract_all(
            items,
            &self.http,
            &self.config.selectors,
            self.config.default_selector.as_deref(),
            &self.cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::TableRenderer;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EMPTY_FEED: &str = r#"<?xml version="1.0"?><rss version="2.0"><channel>
        <title>t</title><link>https://news.google.com</link><description>d</description>
        </channel></rss>"#;

    async fn api_for(server: &MockServer) -> NewsApi {
        NewsApi::new()
            .unwrap()
            .without_proxy()
            .unwrap()
            .with_base_url(Url::parse(&server.uri()).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_FEED))
            .expect(0)
            .mount(&server)
            .await;
        let api = api_for(&server).await;

        for result in [
            api.topic_news("").await,
            api.topic_news("not-a-real-topic").await,
            api.location_news("").await,
            api.location_news("   ").await,
            api.search_news("").await,
        ] {
            assert!(matches!(result, Err(NewsError::InvalidArgument(_))));
        }
    }

    #[tokio::test]
    async fn test_topic_case_insensitive_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/headlines/section/topic/BUSINESS"))
            .and(query_param("ceid", "US:en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_FEED))
            .expect(2)
            .mount(&server)
            .await;
        let api = api_for(&server).await;

        assert!(api.topic_news("BUSINESS").await.unwrap().is_empty());
        assert!(api.topic_news("business").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_and_location_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_FEED))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rss/headlines/section/geo/Cordoba"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_FEED))
            .expect(1)
            .mount(&server)
            .await;
        let api = api_for(&server).await;

        api.top_news().await.unwrap();
        api.location_news("Cordoba").await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(EMPTY_FEED)
                    .set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let token = CancellationToken::new();
        let api = api_for(&server).await.with_cancellation(token.clone());
        token.cancel();

        assert!(matches!(api.top_news().await, Err(NewsError::Cancelled)));
    }

    #[tokio::test]
    async fn test_resolve_requires_renderer() {
        let api = NewsApi::new().unwrap();
        let mut items = vec![NewsItem::new("t", "g/1")];
        assert!(matches!(
            api.resolve_sources(&mut items).await,
            Err(NewsError::Config(_))
        ));

        let api = api.with_renderer(Arc::new(TableRenderer::new(&[("g/1", "https://tn.com.ar/a")])));
        let report = api.resolve_sources(&mut items).await.unwrap();
        assert_eq!(report.succeeded, 1);
    }

    #[test]
    fn test_configure_between_runs() {
        let mut api = NewsApi::new().unwrap();
        api.configure(|c| c.with_language("es").with_limit(500));
        assert_eq!(api.config().language, "es");
        assert_eq!(api.config().limit, crate::config::MAX_SEARCH_RESULTS);

        api.config_mut().order = true;
        assert!(api.config().order);

        api.set_config(QueryConfig::default());
        assert_eq!(api.config(), &QueryConfig::default());
    }

    #[test]
    fn test_last_proxy_setting_wins() {
        let proxy = Url::parse("http://127.0.0.1:3128").unwrap();
        let api = NewsApi::new()
            .unwrap()
            .with_proxy(proxy.clone())
            .unwrap()
            .without_proxy()
            .unwrap();
        assert_eq!(api.proxy(), &ProxySetting::Direct);

        let api = api.with_proxy(proxy.clone()).unwrap();
        assert_eq!(api.proxy(), &ProxySetting::Custom(proxy));
    }

    #[test]
    fn test_independent_instances() {
        let mut a = NewsApi::new().unwrap();
        let b = NewsApi::new().unwrap();
        a.configure(|c| c.with_region("AR"));
        assert_eq!(a.config().region, "AR");
        assert_eq!(b.config().region, "US");
    }
}
