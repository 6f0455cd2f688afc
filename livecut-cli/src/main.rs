mod cli;
mod commands;

use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Commands};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Record {
            input,
            output,
            interval,
            flush_grace_ms,
            duration,
            passthrough,
            ffmpeg,
        } => {
            commands::record(commands::RecordOptions {
                input,
                output,
                interval,
                flush_grace_ms,
                duration,
                passthrough,
                ffmpeg,
            })
            .await
        }
        Commands::Status { output } => commands::status(output).await,
        Commands::Segments { output } => commands::segments(output).await,
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
