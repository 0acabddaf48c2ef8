//! Service error types.

use std::fmt;

use crate::config::API_KEY_ENV;

/// Errors that can occur while constructing the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No API key from the command line, environment or config file
    MissingApiKey,
    /// Failed to create the HTTP client
    HttpClientError(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(
                f,
                "No Planet API key configured (set {} or [planet] api_key)",
                API_KEY_ENV
            ),
            Self::HttpClientError(msg) => write!(f, "HTTP client error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_names_variable() {
        let message = ServiceError::MissingApiKey.to_string();
        assert!(message.contains("PLANET_API_KEY"));
    }

    #[test]
    fn test_http_client_error_display() {
        let err = ServiceError::HttpClientError("tls init".into());
        assert_eq!(err.to_string(), "HTTP client error: tls init");
    }
}
