//! Feed endpoint URL composition.
//!
//! The aggregator takes search operators (`when:`, `before:`, `after:`)
//! inline in the `q` parameter rather than as separate parameters, so every
//! time filter is folded into one space separated query string.

use crate::config::QueryConfig;
use itertools::Itertools;
use std::time::Duration;
use url::Url;

const HOUR_SECS: u64 = 60 * 60;
const DAY_SECS: u64 = 24 * HOUR_SECS;

/// Render a recency window as `<n>h` below one day and `<n>d` otherwise.
/// Remainders are truncated.
///
/// The unit is always written out, so a two hour window is `when:2h` rather
/// than a bare `when:2`.
///
/// # Arguments
/// * `period` - The recency window; anything under an hour rounds down to `0h`.
///
/// # Returns
/// The value for the `when:` search operator.
pub fn format_period(period: Duration) -> String {
    let secs = period.as_secs();
    if secs < DAY_SECS {
        format!("{}h", secs / HOUR_SECS)
    } else {
        format!("{}d", secs / DAY_SECS)
    }
}

/// Build the full `q` value: the free text followed by any time filters.
pub fn compose_search_terms(query: &str, config: &QueryConfig) -> String {
    let when = config.period.map(|p| format!("when:{}", format_period(p)));
    let before = config
        .end_date
        .map(|d| format!("before:{}", d.format("%Y-%m-%d")));
    let after = config
        .start_date
        .map(|d| format!("after:{}", d.format("%Y-%m-%d")));

    std::iter::once(query.to_string())
        .chain(when)
        .chain(before)
        .chain(after)
        .join(" ")
}

/// Compose the feed URL for `path` under `base`.
///
/// `hl`, `gl` and `ceid` are always present. `q` is only added for a
/// non-empty `query`, and time filters only ever ride along with it.
pub fn compose_url(base: &Url, path: &str, query: &str, config: &QueryConfig) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("ceid", &format!("{}:{}", config.region, config.language));
        pairs.append_pair("gl", &config.region);
        pairs.append_pair("hl", &config.language);
        if !query.is_empty() {
            pairs.append_pair("q", &compose_search_terms(query, config));
        }
    }
    url
}
