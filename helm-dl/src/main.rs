mod cli;
mod progress;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use helm_dl_lib::logging::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logging();
    let cli = Cli::parse();
    cli.run().await
}
