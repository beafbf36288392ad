//! GoTrue endpoint definitions and request/response types.

use serde::{Deserialize, Serialize};

use authsync_core::error::ProtocolError;

// ============================================================================
// Endpoint Paths (relative to /auth/v1)
// ============================================================================

/// Password sign-in.
pub const PASSWORD_GRANT: &str = "token?grant_type=password";

/// Refresh-token exchange.
pub const REFRESH_GRANT: &str = "token?grant_type=refresh_token";

/// Current user, verified from the bearer token.
pub const USER: &str = "user";

/// Revoke the current session.
pub const LOGOUT: &str = "logout";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the password grant.
#[derive(Debug, Serialize)]
pub struct PasswordGrantRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Request body for the refresh-token grant.
#[derive(Debug, Serialize)]
pub struct RefreshGrantRequest<'a> {
    pub refresh_token: &'a str,
}

/// Error body, across the shapes GoTrue versions have used.
#[derive(Debug, Default, Deserialize)]
pub struct GoTrueErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    /// Either a string code or the numeric HTTP status.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GoTrueErrorResponse {
    /// Decode an error body; unreadable bodies yield an empty description.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Returns true if the body names an error at all.
    pub fn has_error(&self) -> bool {
        self.error.is_some() || self.error_code.is_some() || self.msg.is_some()
    }

    pub fn into_protocol_error(self, status: u16) -> ProtocolError {
        let string_code = match self.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        };
        let code = self.error_code.or(self.error).or(string_code);
        let message = self.error_description.or(self.msg).or(self.message);
        ProtocolError::new(status, code, message)
    }
}
