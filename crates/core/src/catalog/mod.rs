//! Local mirror of the remote Sonarr catalog.
//!
//! The synchronizer replaces the `sonarr` table wholesale on every run; the
//! search emitter reads it concurrently. Both go through the shared pool.

mod mirror;
mod search;
mod types;

pub use mirror::{replace_series, SeriesMirror};
pub use search::{
    format_line, no_results_message, normalize_pattern, search_series, Chunker, SeriesSearch,
    CHUNK_THRESHOLD,
};
pub use types::*;
