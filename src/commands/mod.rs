//! Command handlers
//!
//! This module contains the handlers behind each `camstash` subcommand.

pub mod args;
pub mod capture;
pub mod settings;
pub mod system;

pub use args::{Cli, Command};

use crate::utils::AppResult;

/// Dispatch a parsed command line
pub fn execute(cli: &Cli) -> AppResult<()> {
    match &cli.command {
        Command::Capture(args) => capture::capture(args).map(|_| ()),
        Command::Settings(args) => settings::settings(args).map(|_| ()),
    }
}
