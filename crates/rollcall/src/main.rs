//! rollcall binary - batch MIDI summary statistics

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollcall::batch::{self, BatchOptions};

/// Extract per-song summary statistics from a directory of MIDI files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory scanned recursively for .mid/.midi files
    #[arg(long, alias = "midi_path", default_value = "midis_cpdl/")]
    midi_path: PathBuf,

    /// Directory receiving numbered song_NNNNNN.json records
    #[arg(long, alias = "data_path", default_value = "song_data_cpdl/")]
    data_path: PathBuf,

    /// Worker thread count
    #[arg(long, short, default_value_t = default_jobs())]
    jobs: usize,
}

/// Available cores minus one, so the host stays responsive during a run.
fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(
        midi_path = %args.midi_path.display(),
        data_path = %args.data_path.display(),
        jobs = args.jobs,
        "rollcall starting"
    );

    let summary = batch::run(&BatchOptions {
        midi_dir: args.midi_path,
        data_dir: args.data_path,
        jobs: args.jobs,
    })?;

    info!(
        written = summary.written(),
        skipped = summary.skipped(),
        "rollcall finished"
    );
    Ok(())
}
