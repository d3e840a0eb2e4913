//! SQLite-backed store for the single weather snapshot.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tokio::sync::watch;

use crate::types::WeatherSnapshot;

/// Holds at most one snapshot; every write replaces it wholesale.
pub struct WeatherCache {
    conn: Mutex<Connection>,
    tx: watch::Sender<Option<WeatherSnapshot>>,
}

impl WeatherCache {
    /// Open (or create) the cache at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                json TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            );
            "#,
        )?;

        let initial = Self::load(&conn)?;
        let (tx, _) = watch::channel(initial);

        Ok(Self {
            conn: Mutex::new(conn),
            tx,
        })
    }

    fn load(conn: &Connection) -> Result<Option<WeatherSnapshot>> {
        let json: Option<String> = conn
            .query_row("SELECT json FROM weather WHERE id = 0", [], |row| row.get(0))
            .optional()?;

        Ok(json.and_then(|json| match serde_json::from_str(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Discarding unreadable weather cache row: {}", e);
                None
            }
        }))
    }

    /// Latest persisted snapshot.
    pub fn get(&self) -> Option<WeatherSnapshot> {
        self.tx.borrow().clone()
    }

    /// Replace the stored snapshot and notify subscribers.
    pub fn replace(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        let now = Utc::now().timestamp_millis();

        self.conn.lock().execute(
            "INSERT OR REPLACE INTO weather (id, json, last_updated) VALUES (0, ?1, ?2)",
            params![json, now],
        )?;

        self.tx.send_replace(Some(snapshot.clone()));
        Ok(())
    }

    /// Subscribe to snapshot changes; the current value is delivered first.
    pub fn subscribe(&self) -> watch::Receiver<Option<WeatherSnapshot>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }

    /// When the snapshot was last written.
    pub fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        let ms: Option<i64> = self
            .conn
            .lock()
            .query_row("SELECT last_updated FROM weather WHERE id = 0", [], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.lock().execute("DELETE FROM weather", [])?;
        self.tx.send_replace(None);
        Ok(())
    }
}

/// Read the persisted snapshot without opening a live cache. Used by
/// out-of-process readers; any failure reads as absent.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Option<WeatherSnapshot> {
    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::debug!("Weather cache not readable: {}", e);
            return None;
        }
    };

    match WeatherCache::load(&conn) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!("Weather cache query failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::CurrentConditions;
    use dayahead_core::TemperatureUnit;

    fn snapshot(temperature: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            latitude: 51.548,
            longitude: -0.103,
            current: CurrentConditions {
                temperature,
                weather_code: 61,
                time: "2026-10-19T07:00".to_string(),
            },
            daily: None,
            unit: TemperatureUnit::Celsius,
            fetched_at: Utc.timestamp_millis_opt(1_760_857_200_000).unwrap(),
        }
    }

    #[test]
    fn test_empty_cache() {
        let cache = WeatherCache::in_memory().unwrap();
        assert!(cache.get().is_none());
        assert!(cache.last_updated().unwrap().is_none());
    }

    #[test]
    fn test_replace_overwrites() {
        let cache = WeatherCache::in_memory().unwrap();
        cache.replace(&snapshot(10.0)).unwrap();
        cache.replace(&snapshot(12.5)).unwrap();

        let count: i64 = cache
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM weather", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(cache.get().unwrap().current.temperature, 12.5);
        assert!(cache.last_updated().unwrap().is_some());
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_cache.db");
        let original = snapshot(8.4);

        {
            let cache = WeatherCache::new(&path).unwrap();
            cache.replace(&original).unwrap();
        }

        let cache = WeatherCache::new(&path).unwrap();
        assert_eq!(cache.get(), Some(original.clone()));
        assert_eq!(read_snapshot(&path), Some(original));
    }

    #[test]
    fn test_corrupt_row_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_cache.db");

        {
            let cache = WeatherCache::new(&path).unwrap();
            cache
                .conn
                .lock()
                .execute(
                    "INSERT INTO weather (id, json, last_updated) VALUES (0, 'not json', 0)",
                    [],
                )
                .unwrap();
        }

        let cache = WeatherCache::new(&path).unwrap();
        assert!(cache.get().is_none());
        assert!(read_snapshot(&path).is_none());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_updates() {
        let cache = WeatherCache::in_memory().unwrap();
        cache.replace(&snapshot(5.0)).unwrap();

        let mut rx = cache.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().current.temperature, 5.0);

        cache.clear().unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_read_snapshot_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_cache.db");

        assert!(read_snapshot(&path).is_none());
        assert!(!path.exists());
    }
}
