//! Reduction of a piano-roll into a flat record of song statistics.

use ndarray::{Array2, Axis};
use pianoroll::{PianoRoll, NUM_PITCHES};
use serde::{Deserialize, Serialize};

/// Errors from feature extraction. Any of these causes the source file to
/// be skipped; no partial record is ever produced.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    #[error("piano-roll has zero time-steps")]
    NoSteps,

    #[error("no active notes in any non-drum track")]
    Silent,

    #[error("tempo vector length {tempo_len} does not match step count {step_count}")]
    TempoMismatch { tempo_len: usize, step_count: usize },
}

/// Summary statistics for one song. Immutable once extracted; serialized
/// verbatim into the per-file JSON record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongFeatures {
    /// Time-steps per beat of the source piano-roll.
    pub resolution: u32,
    /// Distinct observed tempo values, rounded to integer BPM, ascending.
    pub tempi: Vec<u32>,
    /// Representative tempo: total beats divided by total minutes.
    pub qpm: f64,
    pub track_count: usize,
    /// Program number per track, in track order.
    pub programs: Vec<u8>,
    pub uses_drums: bool,
    pub step_count: usize,
    pub duration_seconds: f64,
    /// Leading all-silent time-steps (before the first active step).
    pub leading_silence: usize,
    /// Trailing all-silent time-steps (after the last active step).
    pub trailing_silence: usize,
    /// All-silent time-steps strictly inside the sounding region.
    pub interior_silence: usize,
    /// Simultaneously active pitches at each time-step, non-drum tracks only.
    pub notes_per_step: Vec<u32>,
    /// Active time-steps per pitch ([`NUM_PITCHES`] entries).
    pub pitch_counts: Vec<u32>,
}

/// Reduce a piano-roll to its summary statistics.
///
/// Pure function of its input. Drum tracks contribute to `programs` and
/// `uses_drums` but are excluded from the activation union that silence
/// and density statistics are computed over.
pub fn extract(roll: &PianoRoll) -> Result<SongFeatures, FeatureError> {
    let step_count = roll.step_count();
    if step_count == 0 {
        return Err(FeatureError::NoSteps);
    }
    if roll.tempo.len() != step_count {
        return Err(FeatureError::TempoMismatch {
            tempo_len: roll.tempo.len(),
            step_count,
        });
    }

    // Union of note activations across non-drum tracks
    let mut active = Array2::<u32>::zeros((step_count, NUM_PITCHES));
    for track in roll.tracks.iter().filter(|t| !t.is_drum) {
        active.zip_mut_with(&track.roll, |a, &v| *a |= u32::from(v > 0));
    }

    let notes_per_step = active.sum_axis(Axis(1)).to_vec();
    let pitch_counts = active.sum_axis(Axis(0)).to_vec();

    let first_active = notes_per_step
        .iter()
        .position(|&n| n > 0)
        .ok_or(FeatureError::Silent)?;
    let last_active = notes_per_step
        .iter()
        .rposition(|&n| n > 0)
        .ok_or(FeatureError::Silent)?;

    let leading_silence = first_active;
    let trailing_silence = step_count - 1 - last_active;
    let interior_silence = notes_per_step[first_active..=last_active]
        .iter()
        .filter(|&&n| n == 0)
        .count();

    // Each step spans 1/resolution of a beat at the tempo in force there
    let duration_seconds: f64 = roll
        .tempo
        .iter()
        .map(|&bpm| 60.0 / (bpm * roll.resolution as f64))
        .sum();
    let total_beats = step_count as f64 / roll.resolution as f64;
    let qpm = total_beats / (duration_seconds / 60.0);

    let mut tempi: Vec<u32> = roll.tempo.iter().map(|&bpm| bpm.round() as u32).collect();
    tempi.sort_unstable();
    tempi.dedup();

    Ok(SongFeatures {
        resolution: roll.resolution,
        tempi,
        qpm,
        track_count: roll.tracks.len(),
        programs: roll.tracks.iter().map(|t| t.program).collect(),
        uses_drums: roll.tracks.iter().any(|t| t.is_drum),
        step_count,
        duration_seconds,
        leading_silence,
        trailing_silence,
        interior_silence,
        notes_per_step,
        pitch_counts,
    })
}
