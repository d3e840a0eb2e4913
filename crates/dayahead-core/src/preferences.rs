//! Durable user preferences and the persisted daily summary.
//!
//! Values live in a single SQLite key/value table. Preference changes are
//! published on a `watch` channel; the derived summary has its own channel so
//! that persisting it never wakes preference subscribers.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub const KEY_USER_NAME: &str = "user_name";
pub const KEY_TEMP_UNIT: &str = "temp_unit";
pub const KEY_LATITUDE: &str = "last_latitude";
pub const KEY_LONGITUDE: &str = "last_longitude";
pub const KEY_ONBOARDING_COMPLETED: &str = "onboarding_completed";
pub const KEY_SUMMARY_CACHE: &str = "summary_cache";

pub const DEFAULT_USER_NAME: &str = "User";

/// Location used by consumers that need coordinates before the user has
/// shared one. Never used to trigger a weather fetch.
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    latitude: 51.5480,
    longitude: -0.1030,
};

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Value sent to the forecast API and stored in preferences.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "celsius" => Some(Self::Celsius),
            "fahrenheit" => Some(Self::Fahrenheit),
            _ => None,
        }
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Snapshot of every user preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_name: String,
    pub temperature_unit: TemperatureUnit,
    /// `None` until a location has been stored
    pub location: Option<Coordinates>,
    pub onboarding_completed: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.to_string(),
            temperature_unit: TemperatureUnit::default(),
            location: None,
            onboarding_completed: false,
        }
    }
}

impl UserPreferences {
    pub fn location_or_default(&self) -> Coordinates {
        self.location.unwrap_or(DEFAULT_LOCATION)
    }

    fn from_entries(entries: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        let user_name = entries
            .get(KEY_USER_NAME)
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or(defaults.user_name);

        let temperature_unit = entries
            .get(KEY_TEMP_UNIT)
            .and_then(|unit| TemperatureUnit::parse(unit))
            .unwrap_or(defaults.temperature_unit);

        let latitude = entries.get(KEY_LATITUDE).and_then(|v| v.parse::<f64>().ok());
        let longitude = entries.get(KEY_LONGITUDE).and_then(|v| v.parse::<f64>().ok());
        let location = match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        let onboarding_completed = entries
            .get(KEY_ONBOARDING_COMPLETED)
            .map(|v| v == "true")
            .unwrap_or(false);

        Self {
            user_name,
            temperature_unit,
            location,
            onboarding_completed,
        }
    }
}

/// SQLite-backed preferences store.
pub struct PreferencesStore {
    conn: Mutex<Connection>,
    prefs_tx: watch::Sender<UserPreferences>,
    summary_tx: watch::Sender<Option<String>>,
}

impl PreferencesStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        let entries = Self::read_entries(&conn)?;
        let prefs = UserPreferences::from_entries(&entries);
        let summary = entries.get(KEY_SUMMARY_CACHE).cloned();

        let (prefs_tx, _) = watch::channel(prefs);
        let (summary_tx, _) = watch::channel(summary);

        Ok(Self {
            conn: Mutex::new(conn),
            prefs_tx,
            summary_tx,
        })
    }

    fn read_entries(conn: &Connection) -> Result<HashMap<String, String>> {
        let mut stmt = conn.prepare("SELECT key, value FROM preferences")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        rows.collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read preferences: {}", e))
    }

    /// Write several keys in one transaction and publish the new snapshot.
    /// Publishing happens under the connection lock, so the published value
    /// always matches the last commit.
    fn write(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        let fresh = UserPreferences::from_entries(&Self::read_entries(&conn)?);

        self.prefs_tx.send_if_modified(|current| {
            if *current == fresh {
                false
            } else {
                *current = fresh;
                true
            }
        });
        Ok(())
    }

    /// Synchronous read of the current preferences.
    pub fn snapshot(&self) -> UserPreferences {
        self.prefs_tx.borrow().clone()
    }

    /// Subscribe to preference changes; the current value is delivered first.
    pub fn subscribe(&self) -> watch::Receiver<UserPreferences> {
        let mut rx = self.prefs_tx.subscribe();
        rx.mark_changed();
        rx
    }

    pub fn user_name(&self) -> String {
        self.prefs_tx.borrow().user_name.clone()
    }

    pub fn set_user_name(&self, name: &str) -> Result<()> {
        self.write(&[(KEY_USER_NAME, name.trim().to_string())])
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.prefs_tx.borrow().temperature_unit
    }

    pub fn set_temperature_unit(&self, unit: TemperatureUnit) -> Result<()> {
        self.write(&[(KEY_TEMP_UNIT, unit.as_str().to_string())])
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.prefs_tx.borrow().location
    }

    pub fn has_location(&self) -> bool {
        self.location().is_some()
    }

    /// Store latitude and longitude together.
    pub fn update_location(&self, coordinates: Coordinates) -> Result<()> {
        if !coordinates.is_valid() {
            anyhow::bail!(
                "Coordinates out of range: {}, {}",
                coordinates.latitude,
                coordinates.longitude
            );
        }
        self.write(&[
            (KEY_LATITUDE, coordinates.latitude.to_string()),
            (KEY_LONGITUDE, coordinates.longitude.to_string()),
        ])
    }

    pub fn onboarding_completed(&self) -> bool {
        self.prefs_tx.borrow().onboarding_completed
    }

    pub fn complete_onboarding(&self) -> Result<()> {
        self.write(&[(KEY_ONBOARDING_COMPLETED, "true".to_string())])
    }

    /// Last persisted daily summary, if any.
    pub fn summary(&self) -> Option<String> {
        self.summary_tx.borrow().clone()
    }

    /// Persist the daily summary. No-op when the text is unchanged.
    pub fn save_summary(&self, summary: &str) -> Result<()> {
        let conn = self.conn.lock();
        if self.summary_tx.borrow().as_deref() == Some(summary) {
            return Ok(());
        }

        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![KEY_SUMMARY_CACHE, summary],
        )?;
        self.summary_tx.send_replace(Some(summary.to_string()));
        Ok(())
    }

    pub fn subscribe_summary(&self) -> watch::Receiver<Option<String>> {
        let mut rx = self.summary_tx.subscribe();
        rx.mark_changed();
        rx
    }
}

/// Read the persisted summary straight from the database file.
///
/// Used by out-of-process readers that must not open a full store.
pub fn read_persisted_summary<P: AsRef<Path>>(path: P) -> Option<String> {
    let conn = match Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::debug!("Preferences not readable: {}", e);
            return None;
        }
    };

    conn.query_row(
        "SELECT value FROM preferences WHERE key = ?1",
        params![KEY_SUMMARY_CACHE],
        |row| row.get::<_, String>(0),
    )
    .ok()
}
