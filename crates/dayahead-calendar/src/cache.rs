//! SQLite-based offline cache for upcoming events.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use crate::types::{CalendarEvent, CalendarSnapshot, CalendarStatus};

const META_TOTAL_COUNT: &str = "total_count";

/// SQLite cache for the capped upcoming-event list.
pub struct CalendarCache {
    conn: Mutex<Connection>,
    tx: watch::Sender<CalendarSnapshot>,
}

impl CalendarCache {
    /// Create a new cache at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        let snapshot = Self::read_snapshot(&conn, CalendarStatus::Ok)?;
        let (tx, _) = watch::channel(snapshot);

        Ok(Self {
            conn: Mutex::new(conn),
            tx,
        })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS calendar_events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL,
                location TEXT,
                owner TEXT
            );

            CREATE TABLE IF NOT EXISTS calendar_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_calendar_events_start ON calendar_events(start_ms);
            "#,
        )?;
        Ok(())
    }

    fn read_snapshot(conn: &Connection, status: CalendarStatus) -> Result<CalendarSnapshot> {
        let mut stmt = conn.prepare(
            "SELECT id, title, start_ms, end_ms, location, owner FROM calendar_events ORDER BY start_ms ASC, id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CalendarEvent {
                id: row.get(0)?,
                title: row.get(1)?,
                start: ms_to_datetime(row.get(2)?),
                end: ms_to_datetime(row.get(3)?),
                location: row.get(4)?,
                owner: row.get(5)?,
            })
        })?;

        let events = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read events: {}", e))?;

        let total: Option<i64> = conn
            .query_row(
                "SELECT value FROM calendar_meta WHERE key = ?1",
                params![META_TOTAL_COUNT],
                |row| row.get(0),
            )
            .optional()?;

        // Older rows without a count fall back to what is stored.
        let total_count = total
            .map(|t| t.max(0) as usize)
            .unwrap_or(events.len())
            .max(events.len());

        Ok(CalendarSnapshot {
            events,
            total_count,
            status,
        })
    }

    /// Write and publish under one lock so concurrent writers publish in
    /// commit order.
    fn write(&self, events: &[CalendarEvent], total_count: usize, status: CalendarStatus) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM calendar_events", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO calendar_events
                (id, title, start_ms, end_ms, location, owner)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for event in events {
                stmt.execute(params![
                    event.id,
                    event.title,
                    event.start.timestamp_millis(),
                    event.end.timestamp_millis(),
                    event.location,
                    event.owner,
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO calendar_meta (key, value) VALUES (?1, ?2)",
            params![META_TOTAL_COUNT, total_count as i64],
        )?;
        tx.commit()?;

        let snapshot = Self::read_snapshot(&conn, status)?;
        self.tx.send_replace(snapshot);
        Ok(())
    }

    /// Replace the stored events and the window count in one transaction.
    pub fn replace_all(&self, events: &[CalendarEvent], total_count: usize) -> Result<()> {
        self.write(events, total_count, CalendarStatus::Ok)
    }

    /// Clear the stored events because access was not granted.
    pub fn replace_permission_denied(&self) -> Result<()> {
        self.write(&[], 0, CalendarStatus::PermissionDenied)
    }

    /// Flag the last query as failed. Stored rows are left untouched.
    pub fn mark_query_failed(&self) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.status == CalendarStatus::QueryFailed {
                false
            } else {
                snapshot.status = CalendarStatus::QueryFailed;
                true
            }
        });
    }

    /// Latest stored snapshot.
    pub fn get(&self) -> CalendarSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to changes; the current snapshot is delivered first.
    pub fn subscribe(&self) -> watch::Receiver<CalendarSnapshot> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
