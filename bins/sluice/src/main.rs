mod cmd;

use clap::{Parser, Subcommand};
use cmd::config::{InspectArgs, ParamsArgs, RunArgs};

#[derive(Parser)]
#[command(
    name = "sluice",
    about = "Writes decoded topic payloads into delimited, optionally compressed files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a job: one task per input file.
    Run(RunArgs),
    /// Print the records of an output file, one per line.
    Inspect(InspectArgs),
    /// List the parameters the writer and decoder accept.
    Params(ParamsArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Run(args) => cmd::run::run(args).await,
        Command::Inspect(args) => cmd::inspect::run(args),
        Command::Params(args) => cmd::params::run(args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
