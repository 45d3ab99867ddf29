//! Types for the Sonarr series mirror.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;

/// Date format used for every date column in the mirror.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One series as mirrored from Sonarr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Sonarr series id.
    pub id: i64,
    pub title: String,
    /// e.g. "continuing", "ended".
    pub status: String,
    #[serde(default)]
    pub overview: String,
    /// Most recent aired episode, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_airing: Option<NaiveDate>,
    #[serde(default)]
    pub network: String,
    /// When the series was added to Sonarr.
    pub added: NaiveDate,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Number of seasons.
    #[serde(default)]
    pub seasons: u32,
    #[serde(default)]
    pub monitored: bool,
}

impl SeriesRecord {
    /// Genres as stored in the mirror (comma-joined).
    pub fn genres_column(&self) -> String {
        self.genres.join(",")
    }

    /// Monitored flag as stored in the mirror (0/1).
    pub fn monitored_column(&self) -> i64 {
        i64::from(self.monitored)
    }

    pub fn previous_airing_column(&self) -> Option<String> {
        self.previous_airing
            .map(|d| d.format(DATE_FORMAT).to_string())
    }

    pub fn added_column(&self) -> String {
        self.added.format(DATE_FORMAT).to_string()
    }
}

/// Errors for mirror and search operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
