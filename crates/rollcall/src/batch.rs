//! Batch driver: file discovery, worker pool, per-file outcomes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use pianoroll::{PianoRoll, DEFAULT_RESOLUTION};

use crate::features;
use crate::writer::RecordWriter;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory scanned recursively for MIDI files.
    pub midi_dir: PathBuf,
    /// Directory receiving `song_NNNNNN.json` records.
    pub data_dir: PathBuf,
    /// Worker thread count (clamped to at least 1).
    pub jobs: usize,
}

/// Result of one input file: the record path it produced, or why it was
/// skipped. Skips never abort the batch.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub input: PathBuf,
    pub result: std::result::Result<PathBuf, String>,
}

#[derive(Debug)]
pub struct BatchSummary {
    pub outcomes: Vec<ProcessOutcome>,
}

impl BatchSummary {
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.written()
    }
}

/// Process every MIDI file under `midi_dir`, one JSON record per success.
pub fn run(options: &BatchOptions) -> Result<BatchSummary> {
    let files = collect_midi_files(&options.midi_dir);
    if files.is_empty() {
        warn!(midi_dir = %options.midi_dir.display(), "no MIDI files found");
    } else {
        info!(count = files.len(), "discovered MIDI files");
    }

    let writer = RecordWriter::create(&options.data_dir)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()
        .context("building worker pool")?;

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.green/dim}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );

    let outcomes: Vec<ProcessOutcome> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let result = process_file(path, &writer).map_err(|e| format!("{e:#}"));
                match &result {
                    Ok(output) => {
                        debug!(input = %path.display(), output = %output.display(), "wrote record")
                    }
                    Err(reason) => {
                        warn!(input = %path.display(), reason, "skipping file")
                    }
                }
                progress.inc(1);
                ProcessOutcome {
                    input: path.clone(),
                    result,
                }
            })
            .collect()
    });
    progress.finish_and_clear();

    let summary = BatchSummary { outcomes };
    info!(
        written = summary.written(),
        skipped = summary.skipped(),
        "batch complete"
    );
    Ok(summary)
}

/// Parse, extract, and persist a single file.
fn process_file(path: &Path, writer: &RecordWriter) -> Result<PathBuf> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let roll = PianoRoll::from_bytes(&bytes, DEFAULT_RESOLUTION)?;
    let features = features::extract(&roll)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("input path has no file name")?;

    writer.write(&file_name, &features)
}

/// Recursively collect files whose extension starts with `mid` (.mid,
/// .midi, case-insensitive), sorted for deterministic dispatch order.
pub fn collect_midi_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(%error, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_midi_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn has_midi_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.to_ascii_lowercase().starts_with("mid"))
}
