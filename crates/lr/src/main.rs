//! lr CLI - live-reloading static development server.
//!
//! Provides commands for:
//! - `serve`: Serve a directory and reload browsers when files change

mod browser;
mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::ServeArgs;
use output::Output;

/// lr - Live-reloading static development server.
#[derive(Parser)]
#[command(name = "lr", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a directory with live reload.
    Serve(ServeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Serve(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve(args) => tokio::runtime::Runtime::new()
            .map_err(error::CliError::from)
            .and_then(|rt| rt.block_on(args.execute())),
    };

    if let Err(err) = result {
        output.error(&err);
        std::process::exit(1);
    }
}
