//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::ProviderArgs;
use crate::output;

use super::{Connection, format_time};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(args: LoginArgs, provider: ProviderArgs) -> Result<()> {
    let connection = Connection::open(&provider, None)?;

    eprintln!("{}", "Signing in...".dimmed());

    let session = connection
        .provider
        .sign_in_with_password(&args.email, &args.password)
        .await
        .context("Failed to sign in")?;

    connection.persist().context("Failed to save session")?;

    output::success("Signed in successfully");
    println!();
    output::field("User ID", &session.user.id);
    if let Some(email) = &session.user.email {
        output::field("Email", email);
    }
    if let Some(expires) = session.session.expires_at_utc() {
        output::field("Expires", &format_time(expires));
    }

    Ok(())
}
