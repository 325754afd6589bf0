use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use baymax_cli::{init_tracing, load_settings, print_status, run_build, BuildArgs};

#[derive(Parser, Debug)]
#[command(name = "baymax", version)]
#[command(about = "Health questions answered from a local knowledge base")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the vector index from the knowledge files.
    Build(BuildArgs),
    /// Answer a question grounded in the knowledge base.
    Ask {
        question: Vec<String>,
        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Talk to the assistant without retrieval.
    Chat { message: Vec<String> },
    /// Show what the configured collection holds.
    Status,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings()?;
    match cli.command {
        Command::Build(args) => {
            run_build(settings, &args).await?;
        }
        Command::Ask { question, json } => {
            let assistant = baymax_rag::open_assistant(&settings).await?;
            let resp = assistant.ask(&question.join(" ")).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                println!("{}", resp.answer);
                if !resp.sources.is_empty() {
                    println!("\nSumber: {}", resp.sources.join(", "));
                }
            }
        }
        Command::Chat { message } => {
            let assistant = baymax_rag::open_assistant(&settings).await?;
            println!("{}", assistant.chat(&message.join(" ")).await?.text);
        }
        Command::Status => print_status(&settings).await?,
    }
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
