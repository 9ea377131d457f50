//! flourish command-line front end.

mod cli;
mod commands;
mod config;
mod dirs;

use clap::Parser;
use color_eyre::eyre;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();
    flourish_observability::init_logging(&cli.logs)?;

    commands::run(cli).await
}
