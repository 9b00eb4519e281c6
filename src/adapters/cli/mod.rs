//! CLI Adapter
//!
//! Command-line facade for the routing engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    BundleStatusCmd, CliApp, Command, HealthCmd, QuoteCmd, SlippageCmd, SourcesCmd,
};

use anyhow::Result;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
