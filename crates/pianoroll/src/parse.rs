//! MIDI → piano-roll conversion.
//!
//! Walks every track of the file once, pairing note-on/note-off events into
//! timed notes, then rasterizes the notes onto a step grid of `resolution`
//! steps per beat. Tick t lands on step `t * resolution / ppq` (integer
//! floor); a note occupies the half-open step range `[onset, offset)`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use ndarray::{s, Array2};

use crate::roll::{PianoRoll, Track, NUM_PITCHES};
use crate::{Error, Result};

/// MIDI default tempo, used before the first tempo event.
const DEFAULT_BPM: f64 = 120.0;

/// Fallback PPQ for SMPTE-timed files, which carry no metrical timing.
const TIMECODE_PPQ: u64 = 480;

const DRUM_CHANNEL: u8 = 9;

/// A paired note with absolute tick timing, prior to quantization.
#[derive(Debug, Clone, Copy)]
struct RawNote {
    onset_tick: u64,
    offset_tick: u64,
    pitch: u8,
    velocity: u8,
}

impl PianoRoll {
    /// Parse MIDI bytes into a piano-roll with the given resolution.
    pub fn from_bytes(bytes: &[u8], resolution: u32) -> Result<Self> {
        if resolution == 0 {
            return Err(Error::InvalidResolution);
        }

        let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;

        let ppq = match smf.header.timing {
            midly::Timing::Metrical(ticks) => ticks.as_int() as u64,
            midly::Timing::Timecode(_, _) => TIMECODE_PPQ,
        };
        if ppq == 0 {
            return Err(Error::MidiParse("header declares zero ticks per beat".into()));
        }

        build_roll(&smf, ppq, resolution)
    }

    /// Read and parse a MIDI file from disk.
    pub fn from_file(path: &Path, resolution: u32) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes, resolution)
    }
}

fn build_roll(smf: &Smf, ppq: u64, resolution: u32) -> Result<PianoRoll> {
    // Notes grouped per (file track, channel), preserving encounter order
    // of the groups so output track order is stable.
    let mut voices: Vec<((usize, u8), Vec<RawNote>)> = Vec::new();
    let mut voice_index: HashMap<(usize, u8), usize> = HashMap::new();

    let mut programs: HashMap<(usize, u8), u8> = HashMap::new();
    let mut names: HashMap<usize, String> = HashMap::new();
    let mut tempo_events: Vec<(u64, f64)> = Vec::new();
    let mut end_tick: u64 = 0;

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        // (channel, pitch) → onset/velocity stack, so overlapping repeats
        // of the same pitch close in LIFO order.
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let usec = tempo.as_int();
                    if usec > 0 {
                        tempo_events.push((current_tick, 60_000_000.0 / usec as f64));
                    }
                }
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    if let Ok(name) = String::from_utf8(bytes.to_vec()) {
                        names.entry(track_index).or_insert(name);
                    }
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            // vel=0 NoteOn counts as NoteOff
                            if let Some(stack) = pending.get_mut(&(ch, key.as_int())) {
                                if let Some((onset, velocity)) = stack.pop() {
                                    push_note(
                                        &mut voices,
                                        &mut voice_index,
                                        (track_index, ch),
                                        RawNote {
                                            onset_tick: onset,
                                            offset_tick: current_tick,
                                            pitch: key.as_int(),
                                            velocity,
                                        },
                                    );
                                }
                            }
                        }
                        MidiMessage::ProgramChange { program } => {
                            programs
                                .entry((track_index, ch))
                                .or_insert(program.as_int());
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Close unclosed notes at the track's final tick
        for ((ch, pitch), stack) in pending {
            for (onset, velocity) in stack {
                push_note(
                    &mut voices,
                    &mut voice_index,
                    (track_index, ch),
                    RawNote {
                        onset_tick: onset,
                        offset_tick: current_tick,
                        pitch,
                        velocity,
                    },
                );
            }
        }

        end_tick = end_tick.max(current_tick);
    }

    if voices.is_empty() {
        return Err(Error::NoTracks);
    }

    let step_of = |tick: u64| (tick * resolution as u64 / ppq) as usize;

    let max_offset = voices
        .iter()
        .flat_map(|(_, notes)| notes.iter().map(|n| n.offset_tick))
        .max()
        .unwrap_or(0);
    let n_steps = step_of(end_tick.max(max_offset));

    let tracks = voices
        .into_iter()
        .map(|((track_index, channel), notes)| {
            let mut roll = Array2::<u8>::zeros((n_steps, NUM_PITCHES));
            for note in notes {
                let onset = step_of(note.onset_tick);
                let offset = step_of(note.offset_tick).min(n_steps);
                if offset > onset {
                    roll.slice_mut(s![onset..offset, note.pitch as usize])
                        .mapv_inplace(|v| v.max(note.velocity));
                }
            }
            Track {
                program: programs.get(&(track_index, channel)).copied().unwrap_or(0),
                is_drum: channel == DRUM_CHANNEL,
                name: names.get(&track_index).cloned(),
                roll,
            }
        })
        .collect();

    Ok(PianoRoll {
        resolution,
        tempo: tempo_vector(&tempo_events, ppq, resolution, n_steps),
        tracks,
    })
}

fn push_note(
    voices: &mut Vec<((usize, u8), Vec<RawNote>)>,
    voice_index: &mut HashMap<(usize, u8), usize>,
    key: (usize, u8),
    note: RawNote,
) {
    let index = *voice_index.entry(key).or_insert_with(|| {
        voices.push((key, Vec::new()));
        voices.len() - 1
    });
    voices[index].1.push(note);
}

/// Expand sparse tempo events into one BPM value per time-step.
fn tempo_vector(events: &[(u64, f64)], ppq: u64, resolution: u32, n_steps: usize) -> Vec<f64> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut tempo = Vec::with_capacity(n_steps);
    let mut current = DEFAULT_BPM;
    let mut next = sorted.iter().peekable();

    for step in 0..n_steps {
        let tick = step as u64 * ppq / resolution as u64;
        while let Some(&&(event_tick, bpm)) = next.peek() {
            if event_tick <= tick {
                current = bpm;
                next.next();
            } else {
                break;
            }
        }
        tempo.push(current);
    }

    tempo
}
