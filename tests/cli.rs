use std::f32::consts::PI;
use std::path::Path;

use assert_cmd::Command;
use chunkscribe::audio::encoder;
use chunkscribe::types::AudioData;
use predicates::prelude::*;

const RATE: u32 = 8_000;

fn write_test_wav(path: &Path) {
    let samples: Vec<f32> = (0..RATE as usize * 2)
        .map(|index| {
            let t = index as f32 / RATE as f32;
            (2.0 * PI * 440.0 * t).sin() * 0.6
        })
        .collect();
    let audio = AudioData {
        samples,
        sample_rate: RATE,
    };
    encoder::encode_wav(&audio, path).unwrap();
}

fn chunkscribe() -> Command {
    Command::cargo_bin("chunkscribe").unwrap()
}

#[test]
fn split_rejects_missing_input() {
    chunkscribe()
        .args(["split", "missing.mp3", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn split_rejects_inverted_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_test_wav(&input);

    chunkscribe()
        .arg("split")
        .arg(&input)
        .arg(dir.path().join("chunks"))
        .args(["--min-length", "20:00", "--max-length", "10:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid bounds"));
}

#[test]
fn split_writes_chunk_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_test_wav(&input);
    let chunks = dir.path().join("chunks");

    chunkscribe()
        .arg("split")
        .arg(&input)
        .arg(&chunks)
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk0.wav"));

    assert!(chunks.join("chunk0.wav").is_file());
}

#[test]
fn split_rejects_bad_config_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_test_wav(&input);

    chunkscribe()
        .arg("split")
        .arg(&input)
        .arg(dir.path().join("chunks"))
        .args(["--config-json", "{\"min_silence_ms\": 0}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_silence_ms"));
}

#[test]
fn convert_writes_wav_next_to_requested_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lecture.wav");
    write_test_wav(&input);
    let out = dir.path().join("converted");

    chunkscribe()
        .arg("convert")
        .arg(&input)
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("lecture.wav").is_file());
}

#[test]
fn transcribe_rejects_missing_chunk_dir() {
    chunkscribe()
        .args(["transcribe", "no-such-dir", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk directory does not exist"));
}

#[test]
fn transcribe_rejects_unknown_model_size() {
    let dir = tempfile::tempdir().unwrap();

    chunkscribe()
        .arg("transcribe")
        .arg(dir.path())
        .arg(dir.path().join("out.txt"))
        .args(["--model", "enormous"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown model size"));
}
