//! Error types for the StemChat domain.
//!
//! Uses `thiserror`. Each bounded context has its own enum; the assistant's
//! top-level [`Error`] is deliberately small.

use std::time::Duration;
use thiserror::Error;

/// The top-level error type for assistant operations.
///
/// Only [`Error::InvalidInput`] ever reaches a caller of the assistant's
/// `reply`; provider and data-source failures are absorbed into a degraded
/// answer. [`Error::Config`] is raised while the assistant is being built.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Why a completion could not be obtained from the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned an empty completion")]
    EmptyResponse,
}

impl ProviderError {
    /// Classify a non-success HTTP status from an LLM endpoint.
    pub fn from_status(status_code: u16, body: String) -> Self {
        match status_code {
            401 | 403 => {
                ProviderError::AuthenticationFailed("invalid API key or insufficient permissions".into())
            }
            429 => ProviderError::RateLimited { retry_after_secs: 5 },
            _ => ProviderError::ApiError {
                status_code,
                message: body,
            },
        }
    }
}

/// Failure of a single organizational data query.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Query '{query}' failed: {reason}")]
    QueryFailed { query: String, reason: String },

    #[error("Query '{query}' timed out after {timeout:?}")]
    Timeout { query: String, timeout: Duration },

    #[error("Malformed record in '{query}': {reason}")]
    Malformed { query: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status() {
        let err = ProviderError::from_status(502, "Bad gateway".into());
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[test]
    fn auth_and_rate_limit_statuses_are_classified() {
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ProviderError::from_status(403, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert_eq!(
            ProviderError::from_status(429, "slow down".into()),
            ProviderError::RateLimited { retry_after_secs: 5 }
        );
    }

    #[test]
    fn source_error_names_the_query() {
        let err = SourceError::Timeout {
            query: "events".into(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("events"));
        assert!(err.to_string().contains("10s"));

        let err = SourceError::Timeout {
            query: "news".into(),
            timeout: Duration::from_millis(250),
        };
        assert!(err.to_string().ends_with("timed out after 250ms"));
    }

    #[test]
    fn invalid_input_is_distinct() {
        let err = Error::InvalidInput("message must not be empty".into());
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().starts_with("Invalid input"));
    }
}
