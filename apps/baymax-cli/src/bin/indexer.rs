use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use baymax_cli::{init_tracing, load_settings, run_build, BuildArgs};

/// Rebuilds the health knowledge collection. Destructive: the collection is
/// replaced wholesale.
#[derive(Parser, Debug)]
#[command(name = "baymax-indexer", version)]
struct Cli {
    #[command(flatten)]
    build: BuildArgs,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    run_build(load_settings()?, &cli.build).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
