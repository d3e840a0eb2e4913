//! Centralized error types for the Day Ahead engine.
//!
//! Domain crates keep their own error enums. These cover opening the stores
//! and the startup checks.

use thiserror::Error;

/// Errors surfaced by the dashboard facade.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// One-line text for logs and the status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "Data directory is not usable",
            AppError::Other(_) => "Dashboard failed to start",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "Source could not be reached",
            NetworkError::Timeout => "Source timed out",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "Source is down, retrying later"
            }
            NetworkError::ServerError { .. } => "Source rejected the request",
            NetworkError::InvalidResponse(_) => "Source sent an unreadable response",
        }
    }
}

/// Local cache errors (SQLite stores).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => "Cache file could not be opened",
            DatabaseError::QueryFailed(_) => "Cache query failed",
            DatabaseError::Corruption(_) => "Cache file is corrupt, delete it to rebuild",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "config.toml has an invalid value",
            ConfigError::ParseError(_) => "config.toml could not be parsed",
        }
    }
}

/// Classify a reqwest failure.
pub trait ReqwestErrorExt {
    fn to_network_error(&self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn to_network_error(&self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Classify a rusqlite failure.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(_, _) => DatabaseError::ConnectionFailed(self.to_string()),
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

/// Map an `anyhow` error coming out of a SQLite-backed cache.
///
/// Caches return `anyhow::Result`; when the root cause is a rusqlite error it
/// is classified, otherwise it is reported as a failed query.
pub fn database_error(err: anyhow::Error) -> DatabaseError {
    match err.downcast::<rusqlite::Error>() {
        Ok(sqlite) => sqlite.into_database_error(),
        Err(other) => DatabaseError::QueryFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let db_err = DatabaseError::QueryFailed("boom".into());
        let app_err: AppError = db_err.into();
        assert!(matches!(app_err, AppError::Database(DatabaseError::QueryFailed(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Network(NetworkError::Timeout);
        assert_eq!(app_err.user_message(), "Source timed out");
    }

    #[test]
    fn test_server_error_messages_split_on_status() {
        let server = NetworkError::ServerError { status: 503, message: "down".into() };
        let client = NetworkError::ServerError { status: 404, message: "gone".into() };
        assert!(server.user_message().contains("later"));
        assert!(!client.user_message().contains("later"));
    }

    #[test]
    fn test_database_error_from_anyhow() {
        let err = anyhow::anyhow!("not a sqlite error");
        assert!(matches!(database_error(err), DatabaseError::QueryFailed(_)));

        let sqlite = rusqlite::Error::QueryReturnedNoRows;
        let err = anyhow::Error::from(sqlite);
        assert!(matches!(database_error(err), DatabaseError::QueryFailed(_)));
    }
}
