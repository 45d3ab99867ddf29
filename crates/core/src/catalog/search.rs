//! Title search over the mirror, emitted as size-bounded text chunks.
//!
//! Results are streamed row by row into a buffer; every time the buffer
//! reaches the threshold it is handed to the caller as one chunk. The caller
//! decides how a chunk is delivered (one chat message, one stdout write, ...).

use rusqlite::{params, Connection};
use tracing::debug;

use super::mirror::row_to_series;
use super::{CatalogError, SeriesRecord, DATE_FORMAT};
use crate::db::Pool;
use crate::metrics;

/// Chunk size threshold in bytes.
pub const CHUNK_THRESHOLD: usize = 1500;

const SEARCH_SERIES: &str = "SELECT id, title, status, overview, previous_airing, network,
    added, genres, seasons, monitored FROM sonarr WHERE title LIKE ?1 ORDER BY title, id";

/// Wrap a search term in `%` so a bare term matches anywhere in the title.
pub fn normalize_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    if !term.starts_with('%') {
        pattern.push('%');
    }
    pattern.push_str(term);
    if !pattern.ends_with('%') || pattern.len() == 1 {
        pattern.push('%');
    }
    pattern
}

/// One result line: id, title, status, previous airing and added dates.
pub fn format_line(record: &SeriesRecord) -> String {
    let previous = record
        .previous_airing
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    format!(
        "id={} title={} status={} previous={} added={}\n",
        record.id,
        record.title,
        record.status,
        previous,
        record.added.format(DATE_FORMAT)
    )
}

/// Accumulates lines and yields a chunk once `threshold` bytes are buffered.
#[derive(Debug)]
pub struct Chunker {
    threshold: usize,
    buffer: String,
}

impl Chunker {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            buffer: String::new(),
        }
    }

    /// Append `line`; returns the full buffer if it reached the threshold.
    pub fn push(&mut self, line: &str) -> Option<String> {
        self.buffer.push_str(line);
        if self.buffer.len() >= self.threshold {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// Whatever is left once the input ends, if anything.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}

/// Message sent when a search matches nothing.
pub fn no_results_message(term: &str) -> String {
    format!("no results for '{}'", term)
}

/// Stream the series whose title contains `term` (case-insensitive) and pass
/// each chunk to `on_chunk`. Returns the number of matching rows.
///
/// Always emits at least one chunk: a no-results message when nothing matched.
pub fn search_series(
    conn: &Connection,
    term: &str,
    threshold: usize,
    mut on_chunk: impl FnMut(String),
) -> Result<usize, CatalogError> {
    let pattern = normalize_pattern(term);
    debug!(query = %pattern, "Sonarr query");
    metrics::SEARCH_QUERIES.inc();

    let mut stmt = conn.prepare_cached(SEARCH_SERIES)?;
    let mut rows = stmt.query(params![pattern])?;
    let mut chunker = Chunker::new(threshold);
    let mut matches = 0;
    let mut chunks = 0u64;

    while let Some(row) = rows.next()? {
        let record = row_to_series(row)?;
        matches += 1;
        if let Some(chunk) = chunker.push(&format_line(&record)) {
            chunks += 1;
            on_chunk(chunk);
        }
    }

    if let Some(chunk) = chunker.finish() {
        chunks += 1;
        on_chunk(chunk);
    }
    if matches == 0 {
        chunks += 1;
        on_chunk(no_results_message(term));
    }

    metrics::SEARCH_CHUNKS.inc_by(chunks);
    debug!(query = %pattern, matches, chunks, "Sonarr query finished");
    Ok(matches)
}

/// Pool-backed search entry point.
#[derive(Debug, Clone)]
pub struct SeriesSearch {
    pool: Pool,
    threshold: usize,
}

impl SeriesSearch {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            threshold: CHUNK_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Run a search, handing chunks to `on_chunk` as they fill up.
    pub fn run(&self, term: &str, on_chunk: impl FnMut(String)) -> Result<usize, CatalogError> {
        let conn = self.pool.get()?;
        search_series(&conn, term, self.threshold, on_chunk)
    }

    /// Run a search and collect every chunk.
    pub fn collect(&self, term: &str) -> Result<Vec<String>, CatalogError> {
        let mut chunks = Vec::new();
        self.run(term, |chunk| chunks.push(chunk))?;
        Ok(chunks)
    }
}
