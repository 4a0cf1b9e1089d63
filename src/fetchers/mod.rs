mod firecrawl;

pub use firecrawl::FirecrawlFetcher;

use crate::model::ScrapedPage;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a page retrieval
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider reported failure: {0}")]
    Unsuccessful(String),

    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::InvalidBody(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Turns a URL into page markdown plus metadata
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Get the fetcher name used in logs
    fn name(&self) -> &str;

    async fn fetch(&self, url: &str) -> Result<ScrapedPage, FetchError>;
}
