//! Full-refresh mirror table for the Sonarr series list.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, trace};

use super::{CatalogError, SeriesRecord, DATE_FORMAT};
use crate::db::Pool;

const INSERT_SERIES: &str = "INSERT INTO sonarr
    (id, title, status, overview, previous_airing, network, added, genres, seasons, monitored)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const SELECT_SERIES: &str = "SELECT id, title, status, overview, previous_airing, network,
    added, genres, seasons, monitored FROM sonarr";

/// Replace every row of the mirror with `records`.
///
/// The delete and the inserts share one transaction: readers on other
/// connections see either the previous snapshot or the new one, and any
/// failed statement rolls the table back untouched.
pub fn replace_series(
    conn: &mut Connection,
    records: &[SeriesRecord],
) -> Result<usize, CatalogError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let removed = tx.execute("DELETE FROM sonarr", [])?;
    {
        let mut stmt = tx.prepare_cached(INSERT_SERIES)?;
        for (i, record) in records.iter().enumerate() {
            trace!(item = i, id = record.id, "Populating mirror row");
            stmt.execute(params![
                record.id,
                record.title,
                record.status,
                record.overview,
                record.previous_airing_column(),
                record.network,
                record.added_column(),
                record.genres_column(),
                record.seasons,
                record.monitored_column(),
            ])?;
        }
    }
    tx.commit()?;

    debug!(removed, inserted = records.len(), "Replaced series mirror");
    Ok(records.len())
}

fn parse_date(idx: usize, text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn row_to_series(row: &rusqlite::Row) -> rusqlite::Result<SeriesRecord> {
    let previous_airing = match row.get::<_, Option<String>>(4)? {
        Some(text) if !text.is_empty() => Some(parse_date(4, &text)?),
        _ => None,
    };
    let added: String = row.get(6)?;
    let genres: String = row.get(7)?;
    let monitored: i64 = row.get(9)?;

    Ok(SeriesRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        status: row.get(2)?,
        overview: row.get(3)?,
        previous_airing,
        network: row.get(5)?,
        added: parse_date(6, &added)?,
        genres: genres
            .split(',')
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect(),
        seasons: row.get(8)?,
        monitored: monitored != 0,
    })
}

/// Pool-backed access to the mirror table.
#[derive(Debug, Clone)]
pub struct SeriesMirror {
    pool: Pool,
}

impl SeriesMirror {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Atomically swap the mirror contents for `records`.
    pub fn replace(&self, records: &[SeriesRecord]) -> Result<usize, CatalogError> {
        let mut conn = self.pool.get()?;
        replace_series(&mut conn, records)
    }

    pub fn count(&self) -> Result<u64, CatalogError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sonarr", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn get(&self, id: i64) -> Result<Option<SeriesRecord>, CatalogError> {
        let conn = self.pool.get()?;
        let sql = format!("{} WHERE id = ?", SELECT_SERIES);
        let record = conn
            .query_row(&sql, params![id], row_to_series)
            .optional()?;
        Ok(record)
    }

    /// Every mirrored series, ordered by id.
    pub fn all(&self) -> Result<Vec<SeriesRecord>, CatalogError> {
        let conn = self.pool.get()?;
        let sql = format!("{} ORDER BY id", SELECT_SERIES);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], row_to_series)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db::{PoolOptions, Schema};
    use crate::testing::fixtures;

    fn create_test_mirror() -> (SeriesMirror, Pool, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = Pool::open(
            dir.path().join("mirror.sqlite"),
            &Schema::bundled(),
            PoolOptions::default().with_max_size(4),
        )
        .unwrap();
        (SeriesMirror::new(pool.clone()), pool, dir)
    }

    fn snapshot(prefix: &str, n: i64) -> Vec<SeriesRecord> {
        (1..=n)
            .map(|i| fixtures::series(i, &format!("{} {}", prefix, i)))
            .collect()
    }

    #[test]
    fn test_replace_and_read_back() {
        let (mirror, _pool, _dir) = create_test_mirror();
        let records = vec![
            fixtures::series(1, "Breaking Bad"),
            fixtures::series(2, "Better Call Saul"),
        ];

        assert_eq!(mirror.replace(&records).unwrap(), 2);
        assert_eq!(mirror.count().unwrap(), 2);
        assert_eq!(mirror.all().unwrap(), records);
        assert_eq!(mirror.get(2).unwrap(), Some(records[1].clone()));
        assert_eq!(mirror.get(99).unwrap(), None);
    }

    #[test]
    fn test_replace_drops_rows_missing_from_new_snapshot() {
        let (mirror, _pool, _dir) = create_test_mirror();
        mirror.replace(&snapshot("Old", 5)).unwrap();
        mirror.replace(&snapshot("New", 2)).unwrap();

        let all = mirror.all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.title.starts_with("New")));
    }

    #[test]
    fn test_replace_with_empty_snapshot_clears_mirror() {
        let (mirror, _pool, _dir) = create_test_mirror();
        mirror.replace(&snapshot("Old", 3)).unwrap();
        mirror.replace(&[]).unwrap();
        assert_eq!(mirror.count().unwrap(), 0);
    }

    #[test]
    fn test_stored_column_encodings() {
        let (mirror, pool, _dir) = create_test_mirror();
        let mut record = fixtures::series(3, "The Wire");
        record.genres = vec!["Crime".to_string(), "Drama".to_string()];
        record.monitored = true;
        record.previous_airing = None;
        mirror.replace(&[record]).unwrap();

        let conn = pool.get().unwrap();
        let (genres, monitored, previous, added): (String, i64, Option<String>, String) = conn
            .query_row(
                "SELECT genres, monitored, previous_airing, added FROM sonarr WHERE id = 3",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(genres, "Crime,Drama");
        assert_eq!(monitored, 1);
        assert_eq!(previous, None);
        assert_eq!(added, "2020-01-01");
    }

    #[test]
    fn test_failed_insert_keeps_prior_snapshot() {
        let (mirror, _pool, _dir) = create_test_mirror();
        let prior = snapshot("Prior", 4);
        mirror.replace(&prior).unwrap();

        // Duplicate id fails on the third insert, after the delete ran.
        let mut broken = snapshot("Broken", 5);
        broken[2].id = broken[0].id;

        assert!(mirror.replace(&broken).is_err());
        assert_eq!(mirror.all().unwrap(), prior);
    }

    #[test]
    fn test_concurrent_reader_never_sees_partial_snapshot() {
        let (mirror, pool, _dir) = create_test_mirror();
        let prior = snapshot("Prior", 4);
        mirror.replace(&prior).unwrap();

        let mut writer = pool.get().unwrap();
        let reader = pool.get().unwrap();
        let count = |conn: &Connection| -> i64 {
            conn.query_row("SELECT COUNT(*) FROM sonarr", [], |row| row.get(0))
                .unwrap()
        };

        {
            let tx = writer.transaction().unwrap();
            tx.execute("DELETE FROM sonarr", []).unwrap();
            assert_eq!(count(&reader), 4);

            tx.execute(
                INSERT_SERIES,
                params![100, "Half", "continuing", "", None::<String>, "", "2020-01-01", "", 1, 0],
            )
            .unwrap();
            assert_eq!(count(&reader), 4);
            // Dropped without commit: simulated failure mid-replace.
        }
        assert_eq!(count(&reader), 4);
        drop(reader);
        drop(writer);
        assert_eq!(mirror.all().unwrap(), prior);

        let next = snapshot("Next", 6);
        mirror.replace(&next).unwrap();
        assert_eq!(mirror.all().unwrap(), next);
    }
}
