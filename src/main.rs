//! # act CLI
//!
//! Runs one script and prints every `show` line to stdout.

use act::{run_source, RuntimeConfig};
use act_runtime::tracing::setup_tracing;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "act")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script to run
    file: PathBuf,

    /// Capacity of every process mailbox
    #[arg(long, env = "ACT_MAILBOX_CAPACITY", default_value_t = act_runtime::config::DEFAULT_MAILBOX_CAPACITY)]
    mailbox_capacity: usize,

    /// How long a send waits on a full mailbox, in milliseconds
    #[arg(long, env = "ACT_SEND_TIMEOUT_MS", default_value_t = 5000)]
    send_timeout_ms: u64,

    /// End processes that receive nothing for this long, in milliseconds
    #[arg(long, env = "ACT_IDLE_TIMEOUT_MS")]
    idle_timeout_ms: Option<u64>,

    /// Print the full run report as JSON instead of show lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> RuntimeConfig {
        RuntimeConfig::default()
            .with_mailbox_capacity(self.mailbox_capacity)
            .with_send_timeout(Duration::from_millis(self.send_timeout_ms))
            .with_idle_timeout(self.idle_timeout_ms.map(Duration::from_millis))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let report = run_source(&source, cli.config()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for snapshot in &report.shows {
            println!("{snapshot}");
        }
    }
    Ok(())
}
