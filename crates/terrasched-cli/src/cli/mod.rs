//! CLI for the terrasched chunk job scheduler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use terrasched_core::config;

use commands::{run_config, run_simulate, SimulateArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "terrasched")]
#[command(about = "terrasched: chunk-scoped background job scheduler for streaming terrain", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Stream a square block of chunks through the job pipeline with dig edits, then save.
    Simulate {
        /// Side of the active chunk block (N x N chunks).
        #[arg(long, default_value = "8", value_name = "N")]
        chunks: u32,
        /// Number of dig edits spread over the run.
        #[arg(long, default_value = "64", value_name = "M")]
        edits: u32,
        /// Terrain ticks to drive before the final save.
        #[arg(long, default_value = "20", value_name = "T")]
        ticks: u32,
        /// Worker threads (overrides the config file).
        #[arg(long, value_name = "W")]
        workers: Option<usize>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file path and effective settings.
    Config,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Simulate {
                chunks,
                edits,
                ticks,
                workers,
                json,
            } => {
                let args = SimulateArgs {
                    chunks,
                    edits,
                    ticks,
                    workers,
                };
                run_simulate(&cfg, &args, json)?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
