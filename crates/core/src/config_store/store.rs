use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::StoreError;
use crate::db::Pool;

/// Key/value store over the shared pool.
///
/// Each call checks out its own connection and runs a single statement, so
/// concurrent readers and writers of one key never see a half-written value.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pool: Pool,
}

impl ConfigStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Look up `key`. Returns `Ok(None)` when it was never set.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Look up `key`, failing with [`StoreError::MissingKey`] when absent.
    pub fn require(&self, key: &str) -> Result<String, StoreError> {
        self.get(key)?
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))
    }

    /// Insert `key` or overwrite its current value.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        debug!(key, "Config value stored");
        Ok(())
    }

    /// Remove `key`. Returns the number of rows removed (0 when it was absent).
    pub fn delete(&self, key: &str) -> Result<usize, StoreError> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM config WHERE key = ?", params![key])?;
        debug!(key, removed, "Config value deleted");
        Ok(removed)
    }

    /// All configured keys, in storage order.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key FROM config")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// All `(key, value)` pairs, in storage order.
    pub fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::config_store::keys;
    use crate::db::{PoolOptions, Schema};

    fn create_test_store() -> ConfigStore {
        let pool = Pool::open_in_memory(&Schema::bundled(), PoolOptions::default()).unwrap();
        ConfigStore::new(pool)
    }

    #[test]
    fn test_set_then_get() {
        let store = create_test_store();
        store.set("jeremy", "rossi").unwrap();
        assert_eq!(store.get("jeremy").unwrap(), Some("rossi".to_string()));
    }

    #[test]
    fn test_set_overwrites_existing_value() {
        let store = create_test_store();
        store.set("jeremy", "rossi").unwrap();
        store.set("jeremy", "rossi-rossi").unwrap();

        assert_eq!(store.get("jeremy").unwrap(), Some("rossi-rossi".to_string()));
        assert_eq!(store.list().unwrap(), vec!["jeremy".to_string()]);
    }

    #[test]
    fn test_get_missing_key() {
        let store = create_test_store();
        assert_eq!(store.get("jeremy-no-key").unwrap(), None);
    }

    #[test]
    fn test_delete_key() {
        let store = create_test_store();
        store.set("remove", "me").unwrap();
        assert_eq!(store.get("remove").unwrap(), Some("me".to_string()));

        assert_eq!(store.delete("remove").unwrap(), 1);
        assert_eq!(store.get("remove").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let store = create_test_store();
        assert_eq!(store.delete("never-set").unwrap(), 0);
    }

    #[test]
    fn test_empty_value_is_distinct_from_missing() {
        let store = create_test_store();
        store.set("blank", "").unwrap();
        assert_eq!(store.get("blank").unwrap(), Some(String::new()));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let store = create_test_store();
        let err = store.require(keys::SONARR_URL).unwrap_err();
        assert!(matches!(err, StoreError::MissingKey(_)));
        assert_eq!(err.to_string(), "no config for starr.sonarr.url");

        store.set(keys::SONARR_URL, "http://sonarr:8989").unwrap();
        assert_eq!(store.require(keys::SONARR_URL).unwrap(), "http://sonarr:8989");
    }

    #[test]
    fn test_list_and_entries() {
        let store = create_test_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("c", "3").unwrap();

        let mut keys = store.list().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);

        let mut entries = store.entries().unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_closed_pool_surfaces_error() {
        let pool = Pool::open_in_memory(&Schema::bundled(), PoolOptions::default()).unwrap();
        let store = ConfigStore::new(pool.clone());
        pool.close();

        assert!(matches!(
            store.get("anything"),
            Err(StoreError::Db(crate::db::DbError::PoolClosed))
        ));
    }

    #[test]
    fn test_concurrent_writers_last_value_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = Pool::open(
            dir.path().join("config.sqlite"),
            &Schema::bundled(),
            PoolOptions::default().with_max_size(4),
        )
        .unwrap();
        let store = Arc::new(ConfigStore::new(pool));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..20 {
                        store.set("shared", &format!("{}-{}", i, j)).unwrap();
                        let value = store.get("shared").unwrap().unwrap();
                        assert!(value.contains('-'));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(store.list().unwrap(), vec!["shared".to_string()]);
        assert!(store.get("shared").unwrap().unwrap().ends_with("-19"));
    }
}
