//! scalegrid: inspect autoscaling triggers from the command line.
//!
//! ```text
//! scalegrid validate --trigger trigger.toml
//! scalegrid check --trigger trigger.toml --timeout 30s --format json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod registry;
mod trigger;

#[derive(Parser)]
#[command(
    name = "scalegrid",
    about = "scalegrid: autoscaler metric adapters",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a trigger file and validate its metadata without connecting.
    Validate {
        /// Path to the trigger TOML file
        #[arg(short, long)]
        trigger: PathBuf,
    },
    /// Connect the trigger's scaler, poll it once and print the result.
    Check {
        /// Path to the trigger TOML file
        #[arg(short, long)]
        trigger: PathBuf,
        /// Deadline for connecting and for the poll, e.g. "30s"
        #[arg(long, default_value = "30s", value_parser = parse_timeout)]
        timeout: std::time::Duration,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn parse_timeout(raw: &str) -> Result<std::time::Duration, String> {
    scalegrid_core::parse_duration(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scalegrid=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { trigger } => commands::validate::validate(&trigger),
        Commands::Check {
            trigger,
            timeout,
            format,
        } => commands::check::check(&trigger, timeout, &format).await,
    }
}
