//! Silence-based segmentation.
//!
//! Scans windowed mean amplitude and cuts the recording wherever the level
//! stays under the configured threshold for at least `min_silence`. Each
//! audible span keeps up to `keep_silence` of surrounding quiet so chunk
//! boundaries do not land on a hard edge.

use std::time::Duration;

use crate::types::{AudioData, Segment, SplitConfig};

/// Analysis window for the level scan.
const WINDOW_MS: u64 = 10;

/// Split `audio` into silence-delimited segments, in recording order.
///
/// Quiet stretches shorter than `min_silence` stay inside a segment. A
/// recording with no audible content yields no segments.
pub fn split_on_silence(audio: &AudioData, config: &SplitConfig) -> Vec<Segment> {
    if audio.samples.is_empty() {
        return Vec::new();
    }

    let window = duration_samples(Duration::from_millis(WINDOW_MS), audio.sample_rate).max(1);
    let threshold = db_to_amplitude(config.silence_threshold_db);
    let min_silence = duration_samples(config.min_silence, audio.sample_rate).max(window);
    let keep = duration_samples(config.keep_silence, audio.sample_rate);

    let audible = audible_runs(&audio.samples, window, threshold, min_silence);
    pad_runs(&audible, keep, audio.samples.len())
}

/// Maximal audible spans, separated by silences of at least `min_silence`
/// samples. Shorter silences are absorbed into the surrounding span.
fn audible_runs(
    samples: &[f32],
    window: usize,
    threshold: f32,
    min_silence: usize,
) -> Vec<(usize, usize)> {
    let mut separators: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut idx = 0;
    while idx < samples.len() {
        let end = (idx + window).min(samples.len());
        if mean_amplitude(&samples[idx..end]) <= threshold {
            run_start.get_or_insert(idx);
        } else if let Some(start) = run_start.take() {
            if idx - start >= min_silence {
                separators.push((start, idx));
            }
        }
        idx = end;
    }
    if let Some(start) = run_start {
        if samples.len() - start >= min_silence {
            separators.push((start, samples.len()));
        }
    }

    let mut runs = Vec::new();
    let mut cursor = 0;
    for &(start, end) in &separators {
        if start > cursor {
            runs.push((cursor, start));
        }
        cursor = end;
    }
    if cursor < samples.len() {
        runs.push((cursor, samples.len()));
    }
    runs
}

/// Extend each run by up to `keep` samples of the adjoining silence. Padding
/// never crosses the midpoint of a separating silence, so segments stay
/// disjoint.
fn pad_runs(runs: &[(usize, usize)], keep: usize, total: usize) -> Vec<Segment> {
    runs.iter()
        .enumerate()
        .map(|(index, &(start, end))| {
            let lower = if index == 0 {
                0
            } else {
                midpoint(runs[index - 1].1, start)
            };
            let upper = if index + 1 == runs.len() {
                total
            } else {
                midpoint(end, runs[index + 1].0)
            };
            Segment {
                index,
                start_sample: start.saturating_sub(keep).max(lower),
                end_sample: (end + keep).min(upper),
            }
        })
        .collect()
}

fn midpoint(a: usize, b: usize) -> usize {
    a + (b.saturating_sub(a)) / 2
}

fn mean_amplitude(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f32 = window.iter().map(|sample| sample.abs()).sum();
    sum / window.len() as f32
}

fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

fn duration_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 10_000;

    fn make_audio(samples: Vec<f32>) -> AudioData {
        AudioData {
            samples,
            sample_rate: RATE,
        }
    }

    fn config(min_silence_ms: u64, keep_ms: u64) -> SplitConfig {
        SplitConfig {
            min_silence: Duration::from_millis(min_silence_ms),
            silence_threshold_db: -32.0,
            keep_silence: Duration::from_millis(keep_ms),
        }
    }

    #[test]
    fn loud_signal_stays_one_segment() {
        let audio = make_audio(vec![0.8; 20_000]); // 2 seconds loud
        let segments = split_on_silence(&audio, &config(500, 100));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_sample, 0);
        assert_eq!(segments[0].end_sample, 20_000);
    }

    #[test]
    fn long_pause_splits_into_two_segments() {
        // 1s loud, 0.8s quiet, 1s loud
        let mut samples = vec![0.8; 10_000];
        samples.extend(vec![0.001; 8_000]);
        samples.extend(vec![0.8; 10_000]);
        let audio = make_audio(samples);

        let segments = split_on_silence(&audio, &config(500, 100));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[1].index, 1);
        // 100ms of padding kept on each side of the pause
        assert_eq!(segments[0].end_sample, 11_000);
        assert_eq!(segments[1].start_sample, 17_000);
        assert!(segments[0].end_sample <= segments[1].start_sample);
    }

    #[test]
    fn short_pause_is_absorbed() {
        // 1s loud, 0.2s quiet, 1s loud; separator threshold is 0.5s
        let mut samples = vec![0.8; 10_000];
        samples.extend(vec![0.001; 2_000]);
        samples.extend(vec![0.8; 10_000]);
        let audio = make_audio(samples);

        let segments = split_on_silence(&audio, &config(500, 100));
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn fully_silent_recording_yields_no_segments() {
        let audio = make_audio(vec![0.0; 30_000]);
        let segments = split_on_silence(&audio, &config(500, 100));
        assert!(segments.is_empty());
    }

    #[test]
    fn empty_recording_yields_no_segments() {
        let audio = make_audio(Vec::new());
        assert!(split_on_silence(&audio, &config(500, 100)).is_empty());
    }

    #[test]
    fn padding_is_clamped_at_the_recording_edges() {
        // leading and trailing silence shorter than keep_silence
        let mut samples = vec![0.001; 500];
        samples.extend(vec![0.8; 10_000]);
        samples.extend(vec![0.001; 500]);
        let audio = make_audio(samples);

        let segments = split_on_silence(&audio, &config(2_000, 1_000));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_sample, 0);
        assert_eq!(segments[0].end_sample, 11_000);
    }
}
