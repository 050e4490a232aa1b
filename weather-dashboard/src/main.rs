//! Binary crate for the `weather-dashboard` desktop app.
//!
//! This crate focuses on:
//! - Logging setup
//! - Interactive configuration (`weather-dashboard configure`)
//! - The egui presentation shell

use clap::Parser;

mod app;
mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
