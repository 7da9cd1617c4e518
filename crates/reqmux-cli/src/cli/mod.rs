//! CLI for the reqmux request scheduler.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use reqmux::config;
use std::path::PathBuf;

use commands::{run_config, run_fetch, run_trust};

/// Top-level CLI for reqmux.
#[derive(Debug, Parser)]
#[command(name = "reqmux")]
#[command(about = "reqmux: throttled multiplexed HTTP requests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch one or more URLs through the scheduler.
    Fetch(FetchArgs),

    /// Show the resolved trust bundle and whether peers are verified.
    Trust,

    /// Print the effective configuration (file plus environment overrides).
    Config,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// HTTP/HTTPS URLs to request.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Request method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Extra request header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Request body.
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Maximum simultaneous requests (0 = unbounded). Overrides config.
    #[arg(long, value_name = "N")]
    pub max_simultaneous: Option<usize>,

    /// Maximum requests admitted per tick (0 = unbounded). Overrides config.
    #[arg(long, value_name = "N")]
    pub max_per_tick: Option<usize>,

    /// Proxy address for every request.
    #[arg(long, value_name = "ADDR")]
    pub proxy: Option<String>,

    /// Close connections after each transfer.
    #[arg(long)]
    pub no_reuse_conn: bool,

    /// Total attempts per URL for retryable failures.
    #[arg(long, default_value = "1", value_name = "N")]
    pub retries: u32,

    /// Save response bodies into this directory.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cfg.apply_process_env();
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch(args) => run_fetch(cfg, args).await?,
            CliCommand::Trust => run_trust(&cfg)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
