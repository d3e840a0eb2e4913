//! Calendar-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    /// 401 from the provider.
    #[error("Access token rejected")]
    TokenRejected,

    /// 403 from the provider.
    #[error("Access to calendar denied")]
    AccessDenied,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl CalendarError {
    /// Short text for the calendar card.
    pub fn user_message(&self) -> String {
        match self {
            Self::TokenRejected => "Calendar access token was rejected".to_string(),
            Self::AccessDenied => "Calendar access token lacks read permission".to_string(),
            Self::RateLimited(secs) => format!("Calendar is busy, next try in {}s", secs),
            Self::CalendarNotFound(id) => format!("No calendar named {}", id),
            Self::ApiError(_) => "Your calendar is unavailable".to_string(),
            Self::NetworkError(_) => "Calendar could not be reached".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::NetworkError(_))
    }
}
