//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::ProviderArgs;
use crate::output;
use crate::session::storage;

use super::{Connection, format_time};

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, provider: ProviderArgs) -> Result<()> {
    let stored = storage::require_session()?;
    let connection = Connection::open(&provider, Some(&stored))?;

    eprintln!("{}", "Refreshing session...".dimmed());

    connection
        .provider
        .set_session(stored.session())
        .await
        .context("Saved session is no longer valid")?;

    let session = connection
        .provider
        .refresh_session()
        .await
        .context("Failed to refresh session")?;

    connection
        .persist()
        .context("Failed to save refreshed session")?;

    output::success("Session refreshed successfully");
    output::field("User ID", &session.user.id);
    if let Some(expires) = session.session.expires_at_utc() {
        output::field("Expires", &format_time(expires));
    }

    Ok(())
}
