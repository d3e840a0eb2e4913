pub mod config;
pub mod error;
pub mod preferences;

pub use config::{Config, ValidationResult};
pub use error::{database_error, AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt};
pub use preferences::{
    read_persisted_summary, Coordinates, PreferencesStore, TemperatureUnit, UserPreferences,
    DEFAULT_LOCATION,
};

use anyhow::Result;

/// Initialize logging for the process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Day Ahead core initialized");
    Ok(())
}
