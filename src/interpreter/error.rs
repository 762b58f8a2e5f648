//! Interpreter error types

use thiserror::Error;

/// Interpreter failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InterpretError {
    pub kind: InterpretErrorKind,
    pub message: String,
}

impl InterpretError {
    pub fn new(kind: InterpretErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::InvalidRequest, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::MalformedResponse, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(InterpretErrorKind::Unknown, message)
    }
}

/// Error classification for logging and retry hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400), or a step the interpreter does not handle
    InvalidRequest,
    /// Response arrived but did not follow the verdict contract
    MalformedResponse,
    Unknown,
}

impl InterpretErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::ServerError | Self::MalformedResponse
        )
    }
}
