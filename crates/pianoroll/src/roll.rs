use ndarray::Array2;

/// Pitch axis width of every roll matrix (full MIDI pitch range).
pub const NUM_PITCHES: usize = 128;

/// Default quantization grid: time-steps per quarter-note beat.
pub const DEFAULT_RESOLUTION: u32 = 24;

/// One sounding voice: a (file track, channel) pair that carried notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// General MIDI program number (0 when no program change was seen).
    pub program: u8,
    /// True for the percussion channel (MIDI channel 10).
    pub is_drum: bool,
    /// Track name meta event, when present.
    pub name: Option<String>,
    /// Velocity matrix, time-steps × [`NUM_PITCHES`]. Zero = inactive.
    pub roll: Array2<u8>,
}

/// Time-quantized representation of a whole MIDI file.
///
/// All tracks share the same row count, and `tempo` carries one BPM value
/// per row.
#[derive(Debug, Clone, PartialEq)]
pub struct PianoRoll {
    /// Time-steps per beat.
    pub resolution: u32,
    /// Beats-per-minute at each time-step.
    pub tempo: Vec<f64>,
    pub tracks: Vec<Track>,
}

impl PianoRoll {
    /// Number of time-steps in the roll (rows of every track matrix).
    pub fn step_count(&self) -> usize {
        self.tracks.first().map_or(0, |t| t.roll.nrows())
    }
}
