//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ProviderArgs;
use crate::output;
use crate::session::storage;

use super::Connection;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, provider: ProviderArgs) -> Result<()> {
    let Some(stored) = storage::load_session().context("Failed to load session")? else {
        output::success("Already signed out");
        return Ok(());
    };

    let connection = Connection::open(&provider, Some(&stored))?;
    if connection.restore(&stored).await
        && let Err(e) = connection.provider.sign_out().await
    {
        output::warning(&format!("Remote sign-out failed: {e}"));
    }

    storage::clear_session().context("Failed to remove session file")?;
    output::success("Signed out");
    Ok(())
}
