//! Numbered JSON record output.
//!
//! Records are written as `song_NNNNNN.json` with a six-digit sequential
//! id. The counter is initialized once from a directory scan, then shared
//! by every worker; the mutex spans the whole read-id / write-file /
//! increment sequence so two workers can never claim the same id.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use crate::features::SongFeatures;

const RECORD_PREFIX: &str = "song_";
const RECORD_SUFFIX: &str = ".json";
const RECORD_DIGITS: usize = 6;

/// Writes one `{ "<file name>": {features} }` record per call, under
/// monotonically increasing ids that resume across runs.
#[derive(Debug)]
pub struct RecordWriter {
    dir: PathBuf,
    next_id: Mutex<u64>,
}

impl RecordWriter {
    /// Open an output directory, creating it if needed, and resume
    /// numbering one past the highest existing record id.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        let next_id = next_record_id(&dir)?;

        Ok(Self {
            dir,
            next_id: Mutex::new(next_id),
        })
    }

    /// Persist one record, returning the path it was written to.
    pub fn write(&self, file_name: &str, features: &SongFeatures) -> Result<PathBuf> {
        let mut record = serde_json::Map::new();
        record.insert(
            file_name.to_string(),
            serde_json::to_value(features).context("serializing feature record")?,
        );
        let json = serde_json::to_string(&record).context("serializing feature record")?;

        let mut next_id = self
            .next_id
            .lock()
            .map_err(|_| anyhow::anyhow!("record counter mutex poisoned"))?;
        let path = self
            .dir
            .join(format!("{RECORD_PREFIX}{:06}{RECORD_SUFFIX}", *next_id));
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        *next_id += 1;

        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Scan a directory for the highest `song_NNNNNN.json` suffix. Returns one
/// past it, or 0 for a directory with no records.
fn next_record_id(dir: &Path) -> Result<u64> {
    let mut highest: Option<u64> = None;

    for entry in
        fs::read_dir(dir).with_context(|| format!("listing output directory {}", dir.display()))?
    {
        let entry = entry
            .with_context(|| format!("listing output directory {}", dir.display()))?;
        if let Some(id) = parse_record_id(&entry.file_name().to_string_lossy()) {
            highest = Some(highest.map_or(id, |h| h.max(id)));
        }
    }

    Ok(highest.map_or(0, |h| h + 1))
}

fn parse_record_id(name: &str) -> Option<u64> {
    let digits = name
        .strip_prefix(RECORD_PREFIX)?
        .strip_suffix(RECORD_SUFFIX)?;
    if digits.len() != RECORD_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
