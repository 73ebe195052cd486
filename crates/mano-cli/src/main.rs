//! manoctl: plan network-slice placements from QoS intents.
//!
//! # Usage
//!
//! ```text
//! manoctl plan --inventory sites.toml --intents intents.jsonl --output plan.json
//! manoctl batch --inventory sites.toml --intents intents.jsonl --concurrent
//! manoctl optimize --inventory sites.toml --intents intents.jsonl --algorithm weighted_score
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Inputs;

mod commands;
mod intent;

#[derive(Parser)]
#[command(
    name = "manoctl",
    about = "Slice MANO: network-function placement planner",
    version,
    propagate_version = true
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Place each slice independently and write the orchestration plan.
    Plan {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Place all slices as one batch.
    ///
    /// Without --concurrent the batch is sequential and stops at the first
    /// failure, charging simulated load to each chosen site. With
    /// --concurrent it runs on the cached worker pool.
    Batch {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(long)]
        concurrent: bool,
    },
    /// Run the multi-objective optimizer over all slices.
    Optimize {
        #[command(flatten)]
        inputs: Inputs,

        /// Registered algorithm name (default from the inventory).
        #[arg(short, long)]
        algorithm: Option<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mano=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Plan { inputs } => commands::plan::run(&inputs),
        Command::Batch { inputs, concurrent } => commands::batch::run(&inputs, concurrent).await,
        Command::Optimize { inputs, algorithm } => {
            commands::optimize::run(&inputs, algorithm.as_deref()).await
        }
    }
}
