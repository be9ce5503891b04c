//! `goldkit` - developer CLI for the goldkit core.
//!
//! Runs the same flows as the mobile app (OTP login, MPIN creation, the MPIN
//! gate and resets) against a configured API, keeping the session in a JSON
//! file under the state directory.

mod commands;
mod store;
mod terminal;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = commands::Cli::parse();
    commands::run(cli).await
}
