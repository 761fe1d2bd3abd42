//! Run one detection cycle offline over a snapshot file.

use chrono::Utc;
use clap::Parser;
use skyguard_cli::{load_engine, load_snapshot, render_report};
use skyguard_core::Snapshot;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Detect conflicts in a snapshot file and print conflicts and advisories
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Snapshot JSON file
    snapshot: PathBuf,

    /// Engine configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Conflict zone definitions JSON file
    #[arg(long)]
    zones: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let engine = load_engine(args.config.as_deref(), args.zones.as_deref())?;
    let file = load_snapshot(&args.snapshot)?;
    let epoch = file.epoch().unwrap_or_else(Utc::now);
    let snapshot = Snapshot::ingest(
        1,
        epoch,
        file.into_aircraft(),
        engine.config().max_state_age_s,
    );

    let report = engine.detect(&snapshot)?;
    tracing::info!(
        aircraft = report.stats.aircraft_evaluated,
        pairs = report.stats.pairs_evaluated,
        conflicts = report.conflicts.len(),
        rejected = report.rejections.len(),
        elapsed_ms = report.stats.elapsed_ms,
        "Detection complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    Ok(())
}
