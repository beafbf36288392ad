//! Error types for authsync.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for authsync operations.
///
/// Provider calls surface these to the reconciler, which recovers from them
/// locally. Callers of the reconciler never see them.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, exhausted retries).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (missing or expired session, bad credentials).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (error payloads returned by the identity provider).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (invalid provider URL, bad arguments).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A response body that could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Failures that fit no other category.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Transport-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Network connection failed or was reset.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The request could not be built or sent as described.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16, body: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// Every permitted attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// Returns true if a fresh attempt of the same request may succeed.
    ///
    /// Connection failures, timeouts, 5xx and 429 are retryable. Other
    /// statuses, malformed requests and exhausted retries are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connection { .. } | TransportError::Timeout { .. } => true,
            TransportError::Status { status, .. } => is_retryable_status(*status),
            TransportError::InvalidRequest { .. }
            | TransportError::Http { .. }
            | TransportError::Exhausted { .. } => false,
        }
    }

    /// Returns the HTTP status carried by this error, looking through exhaustion.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Returns the response body carried by this error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. } => Some(body),
            TransportError::Exhausted { last, .. } => last.body(),
            _ => None,
        }
    }
}

/// Returns true for statuses worth another attempt: 5xx and 429.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No session is held, so the operation has nothing to act on.
    #[error("no active session")]
    SessionMissing,

    /// The provider no longer accepts the access token.
    #[error("session expired")]
    SessionExpired,

    /// Refresh token is invalid, revoked, or already used.
    #[error("refresh token invalid")]
    RefreshTokenInvalid,
}

/// Protocol-level errors decoded from identity-provider responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Provider error code (if present).
    pub code: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || self.status == 403
            || self.code.as_deref() == Some("bad_jwt")
            || self.code.as_deref() == Some("session_not_found")
            || self.code.as_deref() == Some("session_expired")
    }

    /// Check if the provider rejected a grant (bad password or refresh token).
    pub fn is_invalid_grant(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some("invalid_grant")
                | Some("invalid_credentials")
                | Some("refresh_token_not_found")
                | Some("refresh_token_already_used")
        )
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid provider URL format.
    #[error("invalid provider URL '{value}': {reason}")]
    ProviderUrl { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
