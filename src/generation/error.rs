//! Generation error types

use std::fmt;
use thiserror::Error;

/// Generation failure with classification
///
/// The kind is for operators; users only ever see a single generic message.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::BackendUnavailable, message)
    }

    pub fn submit_failed(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::SubmitFailed, message)
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::GenerationFailed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Timeout, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Pipeline listing failed or returned nothing
    BackendUnavailable,
    /// Job creation failed
    SubmitFailed,
    /// Explicit terminal failure, bad payload, or anything unexpected
    GenerationFailed,
    /// Polling budget exhausted without a terminal status
    Timeout,
}

impl GenerationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BackendUnavailable => "backend_unavailable",
            Self::SubmitFailed => "submit_failed",
            Self::GenerationFailed => "generation_failed",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
