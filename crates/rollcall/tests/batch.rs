//! End-to-end batch runs over temporary directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use rollcall::batch::{self, BatchOptions};

/// Minimal format-0 MIDI: one program change and two one-beat notes.
fn small_midi(program: u8, first_pitch: u8) -> Vec<u8> {
    let mut track = vec![
        0x00, 0xC0, program, // program change
        0x00, 0x90, first_pitch, 100, // note on
        0x83, 0x60, 0x80, first_pitch, 0, // note off after 480 ticks
        0x00, 0x90, first_pitch + 4, 100,
        0x83, 0x60, 0x80, first_pitch + 4, 0,
    ];
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]); // end of track

    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes()); // format 0
    buf.extend_from_slice(&1u16.to_be_bytes()); // 1 track
    buf.extend_from_slice(&480u16.to_be_bytes()); // ppq
    buf.extend_from_slice(b"MTrk");
    buf.extend_from_slice(&(track.len() as u32).to_be_bytes());
    buf.extend_from_slice(&track);
    buf
}

/// Read every record in a data directory, keyed by the song file name.
fn read_records(data_dir: &Path) -> BTreeMap<String, serde_json::Value> {
    let mut records = BTreeMap::new();
    for entry in fs::read_dir(data_dir).unwrap() {
        let path = entry.unwrap().path();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1, "one song per record file");
        for (name, features) in object {
            records.insert(name.clone(), features.clone());
        }
    }
    records
}

#[test]
fn batch_writes_one_record_per_valid_file() {
    let root = tempfile::tempdir().unwrap();
    let midi_dir = root.path().join("midis");
    let data_dir = root.path().join("data");
    fs::create_dir_all(midi_dir.join("nested")).unwrap();

    fs::write(midi_dir.join("alpha.mid"), small_midi(0, 60)).unwrap();
    fs::write(midi_dir.join("nested/beta.midi"), small_midi(40, 67)).unwrap();
    fs::write(midi_dir.join("broken.mid"), b"truncated garbage").unwrap();

    let summary = batch::run(&BatchOptions {
        midi_dir,
        data_dir: data_dir.clone(),
        jobs: 2,
    })
    .unwrap();

    assert_eq!(summary.written(), 2);
    assert_eq!(summary.skipped(), 1);

    let skipped: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].input.ends_with("broken.mid"));

    let records = read_records(&data_dir);
    assert_eq!(
        records.keys().cloned().collect::<Vec<_>>(),
        vec!["alpha.mid".to_string(), "beta.midi".to_string()],
    );

    let alpha = &records["alpha.mid"];
    assert_eq!(alpha["track_count"], 1);
    assert_eq!(alpha["uses_drums"], false);
    assert_eq!(alpha["programs"][0], 0);
    assert_eq!(records["beta.midi"]["programs"][0], 40);
}

#[test]
fn rerun_never_reuses_record_ids() {
    let root = tempfile::tempdir().unwrap();
    let midi_dir = root.path().join("midis");
    let data_dir = root.path().join("data");
    fs::create_dir_all(&midi_dir).unwrap();
    fs::write(midi_dir.join("tune.mid"), small_midi(0, 60)).unwrap();

    let options = BatchOptions {
        midi_dir,
        data_dir: data_dir.clone(),
        jobs: 1,
    };
    batch::run(&options).unwrap();
    batch::run(&options).unwrap();

    let mut names: Vec<String> = fs::read_dir(&data_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["song_000000.json", "song_000001.json"]);
}

#[test]
fn job_count_does_not_change_the_records() {
    let root = tempfile::tempdir().unwrap();
    let midi_dir = root.path().join("midis");
    fs::create_dir_all(&midi_dir).unwrap();
    for i in 0..6u8 {
        fs::write(
            midi_dir.join(format!("song{i}.mid")),
            small_midi(i, 48 + i * 3),
        )
        .unwrap();
    }

    let serial_dir = root.path().join("serial");
    let parallel_dir = root.path().join("parallel");

    batch::run(&BatchOptions {
        midi_dir: midi_dir.clone(),
        data_dir: serial_dir.clone(),
        jobs: 1,
    })
    .unwrap();
    batch::run(&BatchOptions {
        midi_dir,
        data_dir: parallel_dir.clone(),
        jobs: 4,
    })
    .unwrap();

    // Identical record sets once numbering/order is ignored
    assert_eq!(read_records(&serial_dir), read_records(&parallel_dir));
}

#[test]
fn noteless_file_is_skipped_without_output() {
    let root = tempfile::tempdir().unwrap();
    let midi_dir = root.path().join("midis");
    let data_dir = root.path().join("data");
    fs::create_dir_all(&midi_dir).unwrap();

    // Structurally valid MIDI carrying only a tempo event
    let mut track = vec![0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20];
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    let mut silent = Vec::new();
    silent.extend_from_slice(b"MThd");
    silent.extend_from_slice(&6u32.to_be_bytes());
    silent.extend_from_slice(&0u16.to_be_bytes());
    silent.extend_from_slice(&1u16.to_be_bytes());
    silent.extend_from_slice(&480u16.to_be_bytes());
    silent.extend_from_slice(b"MTrk");
    silent.extend_from_slice(&(track.len() as u32).to_be_bytes());
    silent.extend_from_slice(&track);

    fs::write(midi_dir.join("silent.mid"), silent).unwrap();

    let summary = batch::run(&BatchOptions {
        midi_dir,
        data_dir: data_dir.clone(),
        jobs: 1,
    })
    .unwrap();

    assert_eq!(summary.written(), 0);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(fs::read_dir(&data_dir).unwrap().count(), 0);
}

#[test]
fn missing_input_directory_completes_empty() {
    let root = tempfile::tempdir().unwrap();
    let summary = batch::run(&BatchOptions {
        midi_dir: root.path().join("nowhere"),
        data_dir: root.path().join("data"),
        jobs: 1,
    })
    .unwrap();

    assert_eq!(summary.written(), 0);
    assert_eq!(summary.skipped(), 0);
}
