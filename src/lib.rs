//! camstash - grab frames from attached cameras and save them as video.
//!
//! This is the library crate behind the `camstash` binary. It provides the
//! camera and encoder seams, the capture driver and the settings store.

pub mod capture;
pub mod commands;
pub mod export;
pub mod recorder;
pub mod settings;
pub mod utils;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::Cli;

/// Parse the command line and run the requested command
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camstash=info,camstash_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting camstash v{}", env!("CARGO_PKG_VERSION"));

    commands::execute(&cli).context("camstash failed")
}
