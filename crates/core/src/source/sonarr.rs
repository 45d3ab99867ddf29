//! Sonarr v3 API client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CatalogSource, Endpoint, SourceError};
use crate::catalog::SeriesRecord;

/// Series as returned by `GET /api/v3/series`. Only mirrored fields are kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    id: i64,
    title: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    previous_airing: Option<DateTime<Utc>>,
    #[serde(default)]
    network: Option<String>,
    #[serde(default)]
    added: Option<DateTime<Utc>>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    seasons: Vec<serde_json::Value>,
    #[serde(default)]
    monitored: bool,
}

impl From<SonarrSeries> for SeriesRecord {
    fn from(s: SonarrSeries) -> Self {
        Self {
            id: s.id,
            title: s.title,
            status: s.status,
            overview: s.overview.unwrap_or_default(),
            previous_airing: s.previous_airing.map(|d| d.date_naive()),
            network: s.network.unwrap_or_default(),
            added: s
                .added
                .map(|d| d.date_naive())
                .or_else(|| NaiveDate::from_ymd_opt(1, 1, 1))
                .unwrap_or_default(),
            genres: s.genres,
            seasons: s.seasons.len() as u32,
            monitored: s.monitored,
        }
    }
}

/// Fetches the full series list from a Sonarr instance.
pub struct SonarrSource {
    client: Client,
}

impl SonarrSource {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn series_url(endpoint: &Endpoint) -> Result<String, SourceError> {
        let base = endpoint.url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(SourceError::NotConfigured("Sonarr URL is empty".to_string()));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(SourceError::NotConfigured(format!(
                "Sonarr URL must start with http:// or https://, got '{}'",
                base
            )));
        }
        Ok(format!("{}/api/v3/series", base))
    }

    fn parse_series(body: &str) -> Result<Vec<SeriesRecord>, SourceError> {
        let series: Vec<SonarrSeries> = serde_json::from_str(body).map_err(|e| {
            SourceError::ParseError(format!("Failed to parse series response: {}", e))
        })?;
        Ok(series.into_iter().map(SeriesRecord::from).collect())
    }
}

#[async_trait]
impl CatalogSource for SonarrSource {
    fn name(&self) -> &str {
        "sonarr"
    }

    async fn fetch_series(&self, endpoint: &Endpoint) -> Result<Vec<SeriesRecord>, SourceError> {
        let url = Self::series_url(endpoint)?;
        debug!("Sonarr series request: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &endpoint.token)
            .send()
            .await?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(SourceError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let records = Self::parse_series(&body)?;
        debug!("Sonarr returned {} series", records.len());
        Ok(records)
    }
}
