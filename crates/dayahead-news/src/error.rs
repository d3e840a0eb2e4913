//! News feed error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Feed returned status {0}")]
    Status(u16),

    #[error("Invalid feed payload: {0}")]
    InvalidPayload(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl NewsError {
    /// Short text for the headlines card.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited(secs) => format!("Headline feed is busy, next try in {}s", secs),
            Self::Status(_) => "Headlines are unavailable right now".to_string(),
            Self::InvalidPayload(_) => "Headlines could not be read".to_string(),
            Self::NetworkError(_) => "Headlines could not be reached".to_string(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::NetworkError(_) => true,
            Self::Status(code) => *code >= 500,
            Self::InvalidPayload(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = NewsError::RateLimited(30);
        assert!(err.user_message().contains("30"));

        let err = NewsError::InvalidPayload("eof".into());
        assert_eq!(err.user_message(), "Headlines could not be read");
    }

    #[test]
    fn test_is_retryable() {
        assert!(NewsError::RateLimited(10).is_retryable());
        assert!(NewsError::Status(502).is_retryable());
        assert!(!NewsError::Status(404).is_retryable());
        assert!(!NewsError::InvalidPayload("x".into()).is_retryable());
    }
}
