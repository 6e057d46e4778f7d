//! Error taxonomy for the news pipeline.
//!
//! Only feed retrieval and configuration loading surface these errors to the
//! caller. Failures while resolving or extracting a single item are folded
//! into that item's [`StageOutcome`](crate::models::StageOutcome) instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    /// Empty or unknown query, topic or region. Raised before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<serde_yaml::Error> for NewsError {
    fn from(e: serde_yaml::Error) -> Self {
        NewsError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NewsError>;
