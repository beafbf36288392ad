//! Whoami command implementation.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;

use authsync::{ExecutionContext, SessionReconciler};

use crate::cli::ProviderArgs;
use crate::session::storage;

use super::{Connection, print_pair};

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the credential pair as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, provider: ProviderArgs) -> Result<()> {
    let stored = storage::require_session()?;
    let connection = Connection::open(&provider, Some(&stored))?;

    if connection.restore(&stored).await {
        connection.persist()?;
    }

    let reconciler = SessionReconciler::new(Arc::new(connection.provider.clone()));
    reconciler.start(ExecutionContext::Request).await;
    let pair = reconciler.store().current();

    print_pair(&pair, args.json)?;

    if !args.json && !pair.is_authenticated() {
        bail!("Not signed in. Run 'authsync login' again.");
    }
    Ok(())
}
