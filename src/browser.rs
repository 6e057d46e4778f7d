//! Headless Chrome implementation of [`PageRenderer`].
//!
//! One Chrome process is shared by all resolver workers; every render opens
//! its own tab and closes it afterwards, so tabs never see each other's state.

use crate::error::{NewsError, Result};
use crate::resolver::PageRenderer;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use url::Url;

fn render_err(e: impl std::fmt::Display) -> NewsError {
    NewsError::Render(e.to_string())
}

/// Launch options for [`ChromeRenderer`].
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chrome binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// How long a tab may stay on the aggregator before the render fails.
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
    /// Host whose pages are still part of the redirect chain.
    pub aggregator_host: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            settle_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
            aggregator_host: "news.google.com".to_string(),
        }
    }
}

/// Whether `current` has left the aggregator for an http(s) publisher page.
pub fn is_publisher_url(current: &str, aggregator_host: &str) -> bool {
    let Ok(url) = Url::parse(current) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https")
        && url
            .host_str()
            .is_some_and(|host| !host.eq_ignore_ascii_case(aggregator_host))
}

/// Runs `close` on the held resource if it is dropped without [`close`](Self::close).
///
/// A render future dropped mid-poll (batch cancellation) would otherwise
/// leave its tab open in the shared browser. The drop path spawns the close
/// on the current runtime.
struct CloseOnDrop<T: Send + 'static> {
    inner: Option<T>,
    close: fn(T) -> BoxFuture<'static, ()>,
}

impl<T: Send + 'static> CloseOnDrop<T> {
    fn new(inner: T, close: fn(T) -> BoxFuture<'static, ()>) -> Self {
        Self {
            inner: Some(inner),
            close,
        }
    }

    async fn close(mut self) {
        if let Some(inner) = self.inner.take() {
            (self.close)(inner).await;
        }
    }
}

impl<T: Send + 'static> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Render abandoned; closing tab in the background");
                handle.spawn((self.close)(inner));
            }
            Err(_) => debug!("No runtime to close abandoned tab"),
        }
    }
}

fn close_page(page: Page) -> BoxFuture<'static, ()> {
    async move {
        if let Err(e) = page.close().await {
            debug!(error = %e, "Failed to close tab");
        }
    }
    .boxed()
}

pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: BrowserSettings,
}

impl ChromeRenderer {
    #[instrument(level = "info", skip_all, fields(headless = settings.headless))]
    pub async fn launch(settings: BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(NewsError::Render)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(render_err)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler error");
                }
            }
        });

        info!("Launched headless browser");
        Ok(Self {
            browser,
            handler,
            settings,
        })
    }

    /// Poll the tab until it leaves the aggregator or the settle timeout passes.
    async fn wait_for_publisher(&self, page: &Page) -> Result<String> {
        let poll = async {
            loop {
                if let Some(current) = page.url().await.map_err(render_err)? {
                    if is_publisher_url(&current, &self.settings.aggregator_host) {
                        return Ok::<_, NewsError>(current);
                    }
                }
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        };
        tokio::time::timeout(self.settings.settle_timeout, poll)
            .await
            .map_err(|_| {
                NewsError::Render(format!(
                    "redirect did not settle within {:?}",
                    self.settings.settle_timeout
                ))
            })?
    }

    /// Close Chrome and stop the event handler.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.map_err(render_err)?;
        self.browser.wait().await?;
        self.handler.abort();
        info!("Closed headless browser");
        Ok(())
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let page = self.browser.new_page(url).await.map_err(render_err)?;
        let tab = CloseOnDrop::new(page.clone(), close_page);
        let landed = self.wait_for_publisher(&page).await;
        tab.close().await;
        landed
    }
}
