//! Transport error types

use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ServerError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network(format!("Request timeout: {e}"))
        } else if e.is_connect() || e.is_request() {
            Self::network(format!("Connection failed: {e}"))
        } else {
            Self::rejected(format!("Request failed: {e}"))
        }
    }
}

/// Error classification for delivery retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection problems, timeouts - retryable
    Network,
    /// Flood control (429) - retryable
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// The API refused the request (bad payload, blocked bot, ...) - not retryable
    Rejected,
}

impl TransportErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejected_is_permanent() {
        assert!(TransportError::network("x").is_transient());
        assert!(TransportError::rate_limit("x").is_transient());
        assert!(TransportError::server_error("x").is_transient());
        assert!(!TransportError::rejected("x").is_transient());
    }
}
