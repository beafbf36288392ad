//! CLI argument definitions.

use clap::{Args, Parser};

use crate::commands::Command;

/// Sign in to a GoTrue (Supabase Auth) endpoint and inspect the session.
#[derive(Parser, Debug)]
#[command(name = "authsync")]
#[command(author, version = env!("AUTHSYNC_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where and how to reach the identity provider.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Project base URL; defaults to the one saved at login
    #[arg(long, env = "AUTHSYNC_URL", global = true)]
    pub url: Option<String>,

    /// Public (anon) API key; defaults to the one saved at login
    #[arg(long, env = "AUTHSYNC_ANON_KEY", global = true, hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Attempts per request, the first one included
    #[arg(long, default_value_t = 3, global = true)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, default_value_t = 200, global = true)]
    pub base_delay_ms: u64,
}
