//! The shared credential pair.

use std::sync::Arc;

use tokio::sync::watch;

use authsync_core::{CredentialPair, Session, User};

/// The application-facing container for the current [`CredentialPair`].
///
/// Session and user live in one cell and are replaced together, so a reader
/// never sees one updated and the other stale. Reads are synchronous; use
/// [`subscribe`](Self::subscribe) to react to changes. Clones share the cell.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    cell: Arc<watch::Sender<CredentialPair>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// A store holding the empty pair.
    pub fn new() -> Self {
        Self::with_pair(CredentialPair::empty())
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        let (tx, _rx) = watch::channel(pair);
        Self { cell: Arc::new(tx) }
    }

    /// Snapshot of the whole pair.
    pub fn current(&self) -> CredentialPair {
        self.cell.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.cell.borrow().session().cloned()
    }

    pub fn user(&self) -> Option<User> {
        self.cell.borrow().user().cloned()
    }

    /// A receiver that is notified whenever the pair changes.
    pub fn subscribe(&self) -> watch::Receiver<CredentialPair> {
        self.cell.subscribe()
    }

    /// Wait for the next change and return the new pair.
    ///
    /// Returns `None` once every store handle has been dropped.
    pub async fn changed(receiver: &mut watch::Receiver<CredentialPair>) -> Option<CredentialPair> {
        receiver.changed().await.ok()?;
        Some(receiver.borrow_and_update().clone())
    }

    /// Replace the pair. Returns true if it differed from the held value;
    /// subscribers are only notified in that case.
    pub fn publish(&self, pair: CredentialPair) -> bool {
        self.cell.send_if_modified(|held| {
            if *held == pair {
                false
            } else {
                *held = pair;
                true
            }
        })
    }
}
