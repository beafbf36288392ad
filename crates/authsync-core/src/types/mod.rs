//! Core identity-provider types.
//!
//! These types enforce the credential-pair invariants at construction time,
//! ensuring a session without a user is unrepresentable.

mod credential_pair;
mod event;
mod http;
mod provider_url;
mod session;
mod user;

pub use credential_pair::CredentialPair;
pub use event::{AuthEvent, AuthEventKind};
pub use http::{HttpRequest, HttpResponse, Method};
pub use provider_url::ProviderUrl;
pub use session::{Session, SessionWithUser};
pub use user::User;
