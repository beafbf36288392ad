//! authsync - keep one consistent `(session, user)` pair in sync with an
//! identity provider.
//!
//! A [`SessionReconciler`] derives the pair from the provider's `get_user` and
//! `get_session` calls, publishes it into a [`CredentialStore`], and then (in
//! process-scoped contexts) folds the provider's auth events into it. Failures
//! never reach the caller; they are reported through a [`DiagnosticSink`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authsync::{ExecutionContext, SessionReconciler};
//! use authsync_core::ProviderUrl;
//! use authsync_gotrue::{GoTrueProvider, ProviderConfig};
//!
//! # async fn example() -> Result<(), authsync_core::Error> {
//! let url = ProviderUrl::new("https://xyz.supabase.co")?;
//! let provider = Arc::new(GoTrueProvider::new(ProviderConfig::new(url, "anon-key"))?);
//!
//! let reconciler = SessionReconciler::new(provider);
//! let store = reconciler.store().clone();
//! let _events = reconciler.start(ExecutionContext::Process).await;
//!
//! if let Some(user) = store.user() {
//!     println!("signed in as {}", user.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod reconcile;
pub mod store;

pub use diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticSink, MemorySink, Severity, TracingSink,
};
pub use reconcile::{ExecutionContext, ReconcileConfig, SessionReconciler};
pub use store::CredentialStore;
