use anyhow::Context;
use clap::Parser;
use resindex_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = resindex_utils::tracing::init() {
        eprintln!("failed to initialize logging: {e}");
    }

    let output = cli.run().await.context("resindex command failed")?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
