use anyhow::Result;
use clap::Parser;
use log::info;
use pipescan::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting pipescan");
    cli.execute().await?;

    Ok(())
}
