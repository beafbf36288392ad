//! Session token material.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::{AccessToken, RefreshToken};

use super::User;

/// Token type used for synthesized sessions.
const BEARER: &str = "bearer";

/// Provider-opaque token material.
///
/// A session carries no identity of its own; the identity lives in the
/// [`User`] tracked next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub token_type: String,
    /// Lifetime in seconds as issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Absolute expiry in unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Session {
    /// Build a placeholder session for a verified user whose tokens are not
    /// available locally.
    ///
    /// The placeholder only signals that a session is active: both tokens are
    /// empty and the expiry is `now + lifetime`.
    pub fn placeholder(now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            access_token: AccessToken::default(),
            refresh_token: RefreshToken::default(),
            token_type: BEARER.to_string(),
            expires_in: Some(lifetime.num_seconds()),
            expires_at: Some((now + lifetime).timestamp()),
        }
    }

    /// Returns true if this session carries no token material.
    pub fn is_placeholder(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }

    /// Returns true if the session expires within `margin` of `now`.
    ///
    /// Sessions without a known expiry never count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .is_some_and(|at| at <= (now + margin).timestamp())
    }

    /// Returns the expiry as a timestamp, if known.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|at| DateTime::<Utc>::from_timestamp(at, 0))
    }

    /// Derive `expires_at` from `expires_in` when the provider omitted it.
    pub fn with_computed_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now.timestamp() + secs);
        }
        self
    }
}

/// A session payload with its embedded user, as the provider returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWithUser {
    #[serde(flatten)]
    pub session: Session,
    pub user: User,
}

impl SessionWithUser {
    pub fn new(session: Session, user: User) -> Self {
        Self { session, user }
    }

    /// Split into the token material and the embedded identity.
    pub fn into_parts(self) -> (Session, User) {
        (self.session, self.user)
    }
}
