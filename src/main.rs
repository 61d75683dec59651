use anyhow::Result;
use clap::Parser;
use pocketbook::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    pocketbook::telemetry::init(cli.verbose);
    cli.run().await
}
