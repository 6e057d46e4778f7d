//! Demo binary: run one query, optionally resolve and extract, print JSON.
//!
//! ```sh
//! RUST_LOG=newsapi=debug newsapi -q Politica -l es -r AR -n 10 --period-hours 2 --extract -c selectors.yaml
//! ```

use clap::Parser;
use newsapi::config::{FileConfig, ProxySetting, QueryConfig, load_config};
use newsapi::{NewsApi, NewsItem};
use std::error::Error;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let proxy = match &args.proxy {
        Some(url) => ProxySetting::Custom(url.clone()),
        None => file.proxy_setting(),
    };
    let config = apply_flags(file.apply(QueryConfig::default()), &args);
    info!(language = %config.language, region = %config.region, limit = config.limit, "Configuration loaded");

    // Ctrl-C cancels whatever stage is running.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling");
            on_signal.cancel();
        }
    });

    let api = NewsApi::with_config(config)?
        .with_proxy_setting(proxy)?
        .with_cancellation(cancel);

    let mut items = if let Some(query) = &args.query {
        api.search_news(query).await?
    } else if let Some(topic) = &args.topic {
        api.topic_news(topic).await?
    } else if let Some(location) = &args.location {
        api.location_news(location).await?
    } else {
        api.top_news().await?
    };
    info!(count = items.len(), "Fetched news items");

    if args.resolve || args.extract {
        resolve_and_extract(api, &mut items, args.extract).await?;
    }

    println!("{}", serde_json::to_string_pretty(&items)?);

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    Ok(())
}

fn apply_flags(mut config: QueryConfig, args: &Cli) -> QueryConfig {
    if let Some(language) = &args.language {
        config = config.with_language(language.as_str());
    }
    if let Some(region) = &args.region {
        config = config.with_region(region.as_str());
    }
    if let Some(limit) = args.limit {
        config = config.with_limit(limit);
    }
    if let Some(hours) = args.period_hours {
        config = config.with_period(Duration::from_secs(hours * 3600));
    }
    if args.order {
        config = config.with_order(true);
    }
    config
}

#[cfg(feature = "chrome")]
async fn resolve_and_extract(
    api: NewsApi,
    items: &mut [NewsItem],
    extract: bool,
) -> Result<(), Box<dyn Error>> {
    use newsapi::browser::{BrowserSettings, ChromeRenderer};
    use std::sync::Arc;

    let renderer = Arc::new(ChromeRenderer::launch(BrowserSettings::default()).await?);
    let api = api.with_renderer(renderer.clone());

    let report = api.resolve_sources(items).await?;
    info!(succeeded = report.succeeded, failed = report.failed, "Resolution finished");

    if extract {
        let report = api.extract_contents(items).await;
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Extraction finished"
        );
    }

    drop(api);
    match Arc::try_unwrap(renderer) {
        Ok(renderer) => renderer.close().await?,
        Err(_) => warn!("Browser still shared at shutdown; leaving it to drop"),
    }
    Ok(())
}

#[cfg(not(feature = "chrome"))]
async fn resolve_and_extract(
    _api: NewsApi,
    _items: &mut [NewsItem],
    _extract: bool,
) -> Result<(), Box<dyn Error>> {
    warn!("Built without the `chrome` feature; skipping link resolution and extraction");
    Ok(())
}
