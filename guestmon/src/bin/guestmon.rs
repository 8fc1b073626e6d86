//! One-shot metrics scrape for a single guest.
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use guestmon::kstat::{CommandKstatReader, KstatReader, SnapshotKstatReader};
use guestmon::process::{CommandExecutor, ProcessExecutor};
use guestmon::{AgentOptions, CollectContext, MetricDispatcher, init_logging};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "guestmon", about = "Per-guest kstat and ZFS metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Agent options file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every family once and print the result
    Collect {
        /// Guest UUID
        #[arg(long)]
        vm_uuid: String,

        /// Kstat instance number of the guest's zone
        #[arg(long, allow_negative_numbers = true)]
        instance: Option<i64>,

        /// Read kstats from saved `kstat -j` output instead of running kstat
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Output format (json or pretty)
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => AgentOptions::from_file(path)?,
        None => AgentOptions::default(),
    };
    if cli.verbose {
        options.log_level = "debug".to_string();
    }
    let _logging_guard = init_logging(&options)?;

    match cli.command {
        Commands::Collect {
            vm_uuid,
            instance,
            snapshot,
            format,
        } => {
            let ctx = CollectContext::parse(&vm_uuid, instance)?;

            let executor: Arc<dyn ProcessExecutor> =
                Arc::new(CommandExecutor::new(options.command_timeout()));
            let reader: Arc<dyn KstatReader> = match snapshot {
                Some(path) => Arc::new(
                    SnapshotKstatReader::from_file(&path)
                        .with_context(|| format!("loading kstat snapshot {}", path.display()))?,
                ),
                None => Arc::new(CommandKstatReader::new(&options.kstat_bin, Arc::clone(&executor))),
            };

            let dispatcher = MetricDispatcher::for_vm(&options, reader, executor)?;
            let scrape = dispatcher.collect(&ctx).await?;

            let output = match format {
                OutputFormat::Json => serde_json::to_string(&scrape)?,
                OutputFormat::Pretty => serde_json::to_string_pretty(&scrape)?,
            };
            println!("{}", output);
        }
    }

    Ok(())
}
