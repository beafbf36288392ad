//! Watch command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use authsync::{CredentialStore, ExecutionContext, SessionReconciler};

use crate::cli::ProviderArgs;
use crate::output;
use crate::session::storage;

use super::{Connection, print_pair};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Print every credential pair as a JSON line
    #[arg(long)]
    pub json: bool,

    /// How often to check whether the session needs refreshing
    #[arg(long, default_value_t = 30)]
    pub refresh_interval_secs: u64,
}

pub async fn run(args: WatchArgs, provider: ProviderArgs) -> Result<()> {
    let stored = storage::require_session()?;
    let connection = Connection::open(&provider, Some(&stored))?;
    connection.restore(&stored).await;

    eprintln!("{}", "Watching session changes...".dimmed());
    eprintln!("{}", "Press Ctrl+C to stop.".dimmed());
    eprintln!();

    let reconciler = SessionReconciler::new(Arc::new(connection.provider.clone()));
    let mut changes = reconciler.store().subscribe();

    let events = reconciler
        .start(ExecutionContext::Process)
        .await
        .context("Event task was not started")?;

    changes.mark_unchanged();
    let initial = reconciler.store().current();
    print_pair(&initial, args.json)?;
    if !initial.is_authenticated() {
        events.abort();
        output::warning("Not signed in; nothing to watch.");
        return Ok(());
    }

    let refresher = connection
        .provider
        .spawn_auto_refresh(Duration::from_secs(args.refresh_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = CredentialStore::changed(&mut changes) => {
                let Some(pair) = next else { break };
                if !args.json {
                    println!();
                }
                print_pair(&pair, args.json)?;
                if let Err(e) = connection.persist() {
                    output::warning(&format!("Failed to save session: {e:#}"));
                }
                if !pair.is_authenticated() {
                    break;
                }
            }
        }
    }

    refresher.abort();
    events.abort();
    Ok(())
}
