//! The authoritative session/user pair.

use serde::Serialize;

use super::{Session, SessionWithUser, User};

/// The single authoritative `(session, user)` value exposed to the rest of
/// the application.
///
/// The fields are private so that a session without a user cannot be built:
/// either both are absent, or a user is present with a session (possibly a
/// placeholder, see [`Session::placeholder`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CredentialPair {
    session: Option<Session>,
    user: Option<User>,
}

impl CredentialPair {
    /// The unauthenticated pair.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An authenticated pair.
    pub fn new(session: Session, user: User) -> Self {
        Self {
            session: Some(session),
            user: Some(user),
        }
    }

    /// Derive the pair from a provider session payload. `None` (sign-out)
    /// yields the empty pair.
    pub fn from_session(session: Option<SessionWithUser>) -> Self {
        match session {
            Some(payload) => {
                let (session, user) = payload.into_parts();
                Self::new(session, user)
            }
            None => Self::empty(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Returns true when a user is present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns true when the session was synthesized rather than issued.
    pub fn has_placeholder_session(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_placeholder)
    }

    pub fn into_parts(self) -> (Option<Session>, Option<User>) {
        (self.session, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{AccessToken, RefreshToken};

    fn session(token: &str) -> Session {
        Session {
            access_token: AccessToken::new(token),
            refresh_token: RefreshToken::new("rt"),
            token_type: "bearer".into(),
            expires_in: Some(3600),
            expires_at: Some(1_700_003_600),
        }
    }

    #[test]
    fn empty_pair_is_unauthenticated() {
        let pair = CredentialPair::empty();
        assert!(pair.session().is_none());
        assert!(pair.user().is_none());
        assert!(!pair.is_authenticated());
    }

    #[test]
    fn from_session_splits_payload() {
        let pair = CredentialPair::from_session(Some(SessionWithUser::new(
            session("at"),
            User::new("u1"),
        )));
        assert_eq!(pair.user().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(
            pair.session().map(|s| s.access_token.as_str()),
            Some("at")
        );
        assert!(!pair.has_placeholder_session());
    }

    #[test]
    fn sign_out_payload_is_empty() {
        assert_eq!(CredentialPair::from_session(None), CredentialPair::empty());
    }

    #[test]
    fn equality_is_structural() {
        let a = CredentialPair::new(session("at"), User::new("u1"));
        let b = CredentialPair::new(session("at"), User::new("u1"));
        let c = CredentialPair::new(session("other"), User::new("u1"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
