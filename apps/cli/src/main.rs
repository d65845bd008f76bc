//! `evoapp` entry point.

mod commands;
mod config;
mod options;
mod output;
mod prompt;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{EXIT_CANCELLED, EXIT_FAILURE, Outcome};
use crate::config::CliConfig;

#[derive(Parser)]
#[command(
    name = "evoapp",
    version,
    about = "A tool for creating and retrieving information about an Evolutionary App"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an evolutionary app
    Create(commands::create::CreateArgs),
    /// Get info about an evolutionary app
    Get(commands::get::GetArgs),
    /// Show which version the app wrapper would open
    Resolve(commands::resolve::ResolveArgs),
}

impl Command {
    fn debug(&self) -> bool {
        match self {
            Command::Create(args) => args.debug,
            Command::Get(args) => args.debug,
            Command::Resolve(args) => args.debug,
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,evoapp=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Joins the error and its causes, skipping a cause whose text is already
/// part of the message (thiserror wrappers repeat their source).
fn error_report(error: &anyhow::Error) -> String {
    let mut out = error.to_string();
    for cause in error.chain().skip(1) {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
    }
    out
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with code 2 from clap.
    let cli = Cli::parse();
    let debug = cli.command.debug();
    init_tracing(debug);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting evoapp");

    let config = match CliConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            CliConfig::default()
        }
    };

    let result = match cli.command {
        Command::Create(args) => commands::create::run(args, &config).await,
        Command::Get(args) => commands::get::run(args, &config).await,
        Command::Resolve(args) => commands::resolve::run(args, &config).await,
    };

    match result {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Cancelled) => ExitCode::from(EXIT_CANCELLED),
        Err(e) => {
            if debug {
                eprintln!("Error: {e:?}");
            } else {
                eprintln!("Error: {}", error_report(&e));
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
