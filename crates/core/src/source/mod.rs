//! Remote catalog sources.
//!
//! The synchronizer only needs "the complete current list of series"; how a
//! source gets it is its own business.

mod sonarr;

pub use sonarr::SonarrSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::SeriesRecord;

/// Where a source lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub token: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }
}

/// Errors that can occur when fetching from a remote catalog.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API rejected the credential.
    #[error("Unauthorized: check the configured API token")]
    Unauthorized,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Endpoint unusable (empty URL, bad scheme, ...).
    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

/// A remote catalog that can produce a full snapshot on demand.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short name used in logs and job tags.
    fn name(&self) -> &str;

    /// Fetch every series the remote currently knows about.
    async fn fetch_series(&self, endpoint: &Endpoint) -> Result<Vec<SeriesRecord>, SourceError>;
}
