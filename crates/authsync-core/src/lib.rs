//! authsync-core - Core types and traits for identity-provider session sync.

pub mod error;
pub mod tokens;
pub mod traits;
pub mod types;

pub use error::Error;
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{AuthEvents, AuthProvider, Transport};
pub use types::{
    AuthEvent, AuthEventKind, CredentialPair, HttpRequest, HttpResponse, Method, ProviderUrl,
    Session, SessionWithUser, User,
};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
