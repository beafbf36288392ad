//! Identity-provider capability trait.

use async_trait::async_trait;

use crate::Result;
use crate::types::{SessionWithUser, User};

use super::AuthEvents;

/// The identity-provider capability the reconciler depends on.
///
/// One instance is owned per execution context: request-scoped on a server,
/// process-scoped in a long-lived client.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Event stream type for this provider.
    type Events: AuthEvents;

    /// Fetch the current user, verified against the provider.
    ///
    /// Returns `Ok(None)` when there is no user to verify.
    async fn get_user(&self) -> Result<Option<User>>;

    /// Return the current session with its embedded user.
    ///
    /// This may come from local state and need not be freshly verified.
    async fn get_session(&self) -> Result<Option<SessionWithUser>>;

    /// Subscribe to auth-state changes. Events are delivered in the order
    /// the provider emitted them.
    fn on_auth_state_change(&self) -> Self::Events;
}
