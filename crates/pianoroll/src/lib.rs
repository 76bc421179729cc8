//! Piano-roll construction from standard MIDI files.
//!
//! A [`PianoRoll`] is the time-quantized view of a song: one velocity
//! matrix per sounding track (time-steps × 128 pitches), a per-step tempo
//! vector, and enough track metadata (program number, drum flag) for
//! downstream statistics. Parsing of the MIDI bytes themselves is handled
//! by `midly`.

pub mod parse;
pub mod roll;

pub use roll::{PianoRoll, Track, DEFAULT_RESOLUTION, NUM_PITCHES};

use std::path::PathBuf;

/// Errors from piano-roll construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("file contains no note-carrying tracks")]
    NoTracks,

    #[error("resolution must be nonzero")]
    InvalidResolution,

    #[error("failed reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
