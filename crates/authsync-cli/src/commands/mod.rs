//! Subcommand implementations.

mod login;
mod logout;
mod refresh;
mod watch;
mod whoami;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Subcommand;
use serde::Serialize;

use authsync_core::{CredentialPair, ProviderUrl, User};
use authsync_gotrue::{GoTrueProvider, ProviderConfig, RetryPolicy};

use crate::cli::ProviderArgs;
use crate::output;
use crate::session::{StoredSession, storage};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login(login::LoginArgs),

    /// Display the reconciled session and user
    Whoami(whoami::WhoamiArgs),

    /// Refresh the session tokens
    Refresh(refresh::RefreshArgs),

    /// Sign out and forget the saved session
    Logout(logout::LogoutArgs),

    /// Follow session changes until interrupted
    Watch(watch::WatchArgs),
}

pub async fn handle(command: Command, provider: ProviderArgs) -> Result<()> {
    match command {
        Command::Login(args) => login::run(args, provider).await,
        Command::Whoami(args) => whoami::run(args, provider).await,
        Command::Refresh(args) => refresh::run(args, provider).await,
        Command::Logout(args) => logout::run(args, provider).await,
        Command::Watch(args) => watch::run(args, provider).await,
    }
}

/// A provider client plus the settings it was built from.
pub(crate) struct Connection {
    pub provider: GoTrueProvider,
    pub url: String,
    pub anon_key: String,
}

impl Connection {
    /// Build a client from the flags, falling back to the saved session.
    pub fn open(args: &ProviderArgs, stored: Option<&StoredSession>) -> Result<Self> {
        let url = args
            .url
            .clone()
            .or_else(|| stored.map(|s| s.url.clone()))
            .context("No provider URL. Pass --url or set AUTHSYNC_URL.")?;
        let anon_key = args
            .anon_key
            .clone()
            .or_else(|| stored.map(|s| s.anon_key.clone()))
            .context("No anon key. Pass --anon-key or set AUTHSYNC_ANON_KEY.")?;

        let provider_url = ProviderUrl::new(&url).context("Invalid provider URL")?;
        let retry = RetryPolicy {
            max_attempts: args.max_attempts,
            base_delay: Duration::from_millis(args.base_delay_ms),
            ..RetryPolicy::default()
        };
        let config = ProviderConfig::new(provider_url, anon_key.as_str()).with_retry(retry);
        let provider = GoTrueProvider::new(config).context("Failed to create HTTP client")?;

        Ok(Self {
            provider,
            url,
            anon_key,
        })
    }

    /// Hand the saved tokens to the provider. A rejected session is
    /// reported, not fatal: the provider simply stays signed out.
    pub async fn restore(&self, stored: &StoredSession) -> bool {
        match self.provider.set_session(stored.session()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Could not restore saved session");
                output::warning(&format!("Saved session could not be restored: {e}"));
                false
            }
        }
    }

    /// Persist whatever session the provider now holds.
    pub fn persist(&self) -> Result<()> {
        match self.provider.current_session() {
            Some(session) => {
                storage::save_session(&StoredSession::new(&self.url, &self.anon_key, &session))
            }
            None => storage::clear_session(),
        }
    }
}

/// Printable, token-free view of a credential pair.
#[derive(Debug, Serialize)]
pub(crate) struct PairView<'a> {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionView {
    pub token_type: String,
    pub placeholder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl<'a> From<&'a CredentialPair> for PairView<'a> {
    fn from(pair: &'a CredentialPair) -> Self {
        Self {
            authenticated: pair.is_authenticated(),
            user: pair.user(),
            session: pair.session().map(|s| SessionView {
                token_type: s.token_type.clone(),
                placeholder: s.is_placeholder(),
                expires_at: s.expires_at,
            }),
        }
    }
}

/// Print a pair as labeled fields or one JSON line.
pub(crate) fn print_pair(pair: &CredentialPair, json: bool) -> Result<()> {
    if json {
        return output::json(&PairView::from(pair));
    }

    let Some(user) = pair.user() else {
        output::field("User", "(signed out)");
        return Ok(());
    };

    output::field("User ID", &user.id);
    if let Some(email) = &user.email {
        output::field("Email", email);
    }
    if let Some(session) = pair.session() {
        let kind = if session.is_placeholder() {
            "placeholder"
        } else {
            "active"
        };
        output::field("Session", kind);
        if let Some(expires) = session.expires_at_utc() {
            output::field("Expires", &format_time(expires));
        }
    }
    Ok(())
}

pub(crate) fn format_time(at: DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
