//! Capability traits for providers, transports and event streams.

mod events;
mod provider;
mod transport;

pub use events::AuthEvents;
pub use provider::AuthProvider;
pub use transport::Transport;
