//! confnotes CLI: conference schedule pages to Markdown notes.
//!
//! Imports session and presentation pages from an online meeting schedule
//! into a notes vault, one linked note per entry.

mod calendar;
mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = commands::load_app_config(&cli)?;
    commands::init_tracing(&cli, config.defaults.debug);
    commands::run(cli, config).await
}
