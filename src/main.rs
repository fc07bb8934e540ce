//! CLI entry point for wirelab.
//!
//! Headless driving of the simulator core:
//! - `run` loads a circuit document and simulates it, either a fixed
//!   number of ticks or free-running at the configured rate until Ctrl+C;
//! - `check` validates a document (every node type resolvable, every
//!   segment well-formed) and prints the resolved net report;
//! - `types` lists the registered node types.
//!
//! Rendering frontends link the library directly; this binary exists for
//! scripting, CI and debugging sessions.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wirelab::config::WirelabConfig;
use wirelab::registry::NodeRegistry;
use wirelab::session;
use wirelab::workbench::{RunnerCommand, SharedWorkbench, SimRunner};

#[derive(Parser)]
#[command(name = "wirelab")]
#[command(about = "Grid-based digital logic circuit simulator", long_about = None)]
struct Cli {
    /// Path to a configuration TOML (defaults to config/wirelab.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a circuit document.
    Run {
        /// Path to the circuit JSON document.
        document: PathBuf,

        /// Run exactly this many ticks instead of free-running.
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Validate a document and print its net report.
    Check {
        /// Path to the circuit JSON document.
        document: PathBuf,
    },

    /// List registered node types.
    Types,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WirelabConfig::load_from(path),
        None => WirelabConfig::load(),
    }
    .context("loading configuration")?;
    config.validate().map_err(|e| anyhow!(e))?;
    wirelab::trace::init_from_config(&config);

    match cli.command {
        Commands::Run { document, ticks } => run(&document, ticks, &config).await,
        Commands::Check { document } => check(&document, &config),
        Commands::Types => {
            let registry = NodeRegistry::with_builtins();
            for key in registry.keys() {
                println!("{key}");
            }
            Ok(())
        }
    }
}

fn open(document: &Path, config: &WirelabConfig) -> Result<SharedWorkbench> {
    let registry = Arc::new(NodeRegistry::with_builtins());
    let doc = session::load_document(document)
        .with_context(|| format!("loading {}", document.display()))?;
    let bench = doc
        .instantiate(registry, config.simulation.oscillation_limit)
        .context("instantiating circuit")?;
    Ok(SharedWorkbench::new(bench))
}

async fn run(document: &Path, ticks: Option<u64>, config: &WirelabConfig) -> Result<()> {
    let shared = open(document, config)?;

    match ticks {
        Some(n) => {
            for _ in 0..n {
                shared.with(|w| w.tick());
            }
        }
        None => {
            let runner = SimRunner::spawn(shared.clone(), config.simulation.tick_rate_hz);
            let _ = runner.send(RunnerCommand::Start).await;
            println!(
                "running at {} ticks/s - press Ctrl+C to stop",
                config.simulation.tick_rate_hz
            );
            tokio::signal::ctrl_c().await?;
            runner.shutdown().await;
        }
    }

    report(&shared);
    Ok(())
}

fn check(document: &Path, config: &WirelabConfig) -> Result<()> {
    let shared = open(document, config)?;
    println!("{} is valid", document.display());
    report(&shared);
    Ok(())
}

fn report(shared: &SharedWorkbench) {
    shared.with(|w| {
        println!(
            "tick {}: {} nodes, {} segments, {} nets, {} queued events",
            w.current_tick(),
            w.topology().node_count(),
            w.topology().segment_count(),
            w.net_list().len(),
            w.pending_events(),
        );
        for net in w.nets() {
            let mut flags = String::new();
            if net.conflict {
                flags.push_str(" [conflict]");
            }
            if net.oscillating {
                flags.push_str(" [oscillating]");
            }
            println!(
                "  {}: value {} ({} segments, {} pins){}",
                net.id,
                net.value,
                net.segments.len(),
                net.pins.len(),
                flags
            );
        }
        for node in w.topology().nodes() {
            if node.type_key() == "probe" {
                if let Ok(value) = w.read_pin(node.id(), "d") {
                    println!("  probe {}: {}", node.id(), value);
                }
            }
        }
    });
}
