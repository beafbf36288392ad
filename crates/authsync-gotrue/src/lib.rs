//! authsync-gotrue - GoTrue-backed identity provider.
//!
//! Every outbound request goes through a [`Transport`](authsync_core::Transport);
//! the default stack is a [`RetryingTransport`] over a [`ReqwestTransport`].

mod endpoints;
mod events;
mod jwt;
mod provider;
pub mod transport;

pub use events::{AuthEventStream, EventHub};
pub use provider::{GoTrueProvider, ProviderConfig};
pub use transport::{ReqwestTransport, RetryPolicy, RetryingTransport};
