//! Batch summary statistics for MIDI collections.
//!
//! Walks a directory of `.mid`/`.midi` files, turns each into a
//! [`pianoroll::PianoRoll`], reduces it to a flat [`SongFeatures`] record,
//! and appends the record as a numbered `song_NNNNNN.json` file in the
//! output directory. Numbering resumes across runs and is safe under
//! concurrent workers.

pub mod batch;
pub mod features;
pub mod writer;

pub use batch::{run, BatchOptions, BatchSummary, ProcessOutcome};
pub use features::{extract, FeatureError, SongFeatures};
pub use writer::RecordWriter;
