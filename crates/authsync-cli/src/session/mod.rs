//! Persisted login state.

pub mod storage;

use serde::{Deserialize, Serialize};

use authsync_core::{AccessToken, RefreshToken, Session, SessionWithUser};

/// What is kept between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub url: String,
    pub anon_key: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl StoredSession {
    pub fn new(url: &str, anon_key: &str, session: &SessionWithUser) -> Self {
        Self {
            url: url.to_string(),
            anon_key: anon_key.to_string(),
            user_id: session.user.id.clone(),
            email: session.user.email.clone(),
            access_token: session.session.access_token.as_str().to_string(),
            refresh_token: session.session.refresh_token.as_str().to_string(),
            expires_at: session.session.expires_at,
        }
    }

    /// The token material to hand back to the provider.
    pub fn session(&self) -> Session {
        Session {
            access_token: AccessToken::new(self.access_token.as_str()),
            refresh_token: RefreshToken::new(self.refresh_token.as_str()),
            token_type: "bearer".to_string(),
            expires_in: None,
            expires_at: self.expires_at,
        }
    }
}
