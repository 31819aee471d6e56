//! Core types for the chunkscribe audio pipeline

use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Deserialize;

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 44100)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> Duration {
        sample_len_to_duration(self.samples.len(), self.sample_rate)
    }
}

/// One silence-delimited span of the source recording, as produced by the
/// splitter. The sample range includes the retained silence padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Ordinal position in the original recording
    pub index: usize,
    pub start_sample: usize,
    pub end_sample: usize,
}

impl Segment {
    pub fn sample_len(&self) -> usize {
        self.end_sample.saturating_sub(self.start_sample)
    }

    pub fn duration(&self, sample_rate: u32) -> Duration {
        sample_len_to_duration(self.sample_len(), sample_rate)
    }
}

/// An ordered, non-empty run of consecutive segments destined for a single
/// exported file. Aggregate duration is the sum of the member durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Indices of the segments that make up this chunk, in recording order
    pub segment_indices: Vec<usize>,
    pub duration: Duration,
}

/// Duration window for refined chunks: inclusive floor and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min_length: Duration,
    pub max_length: Duration,
}

impl Default for ChunkBounds {
    fn default() -> Self {
        Self {
            min_length: Duration::from_secs(10 * 60),
            max_length: Duration::from_secs(15 * 60),
        }
    }
}

/// Silence-splitter knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    /// Minimum quiet stretch that separates two segments
    pub min_silence: Duration,
    /// Level below which a window counts as silence, in dBFS
    pub silence_threshold_db: f32,
    /// Quiet padding retained on each side of a segment
    pub keep_silence: Duration,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_silence: Duration::from_secs(2),
            silence_threshold_db: -32.0,
            keep_silence: Duration::from_millis(500),
        }
    }
}

/// Runtime-configurable splitter settings parsed from JSON input. Absent
/// fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSplitConfig {
    #[serde(default, alias = "minSilenceMs")]
    pub min_silence_ms: Option<u64>,
    #[serde(default, alias = "silenceThresholdDb", alias = "threshold_db")]
    pub silence_threshold_db: Option<f32>,
    #[serde(default, alias = "keepSilenceMs")]
    pub keep_silence_ms: Option<u64>,
    #[serde(default, alias = "minLengthMs")]
    pub min_length_ms: Option<u64>,
    #[serde(default, alias = "maxLengthMs")]
    pub max_length_ms: Option<u64>,
}

impl RuntimeSplitConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(ms) = self.min_silence_ms {
            ensure!(ms > 0, "min_silence_ms must be greater than zero");
        }
        if let Some(db) = self.silence_threshold_db {
            ensure!(db.is_finite(), "silence_threshold_db must be finite");
            ensure!(db < 0.0, "silence_threshold_db must be below 0 dBFS");
        }
        if let Some(ms) = self.min_length_ms {
            ensure!(ms > 0, "min_length_ms must be greater than zero");
        }
        if let Some(ms) = self.max_length_ms {
            ensure!(ms > 0, "max_length_ms must be greater than zero");
        }
        if let (Some(min), Some(max)) = (self.min_length_ms, self.max_length_ms) {
            ensure!(
                min <= max,
                "min_length_ms ({}) must not exceed max_length_ms ({})",
                min,
                max
            );
        }
        Ok(())
    }

    /// Overlay the configured fields onto `split` and `bounds`.
    pub fn apply(&self, split: &mut SplitConfig, bounds: &mut ChunkBounds) {
        if let Some(ms) = self.min_silence_ms {
            split.min_silence = Duration::from_millis(ms);
        }
        if let Some(db) = self.silence_threshold_db {
            split.silence_threshold_db = db;
        }
        if let Some(ms) = self.keep_silence_ms {
            split.keep_silence = Duration::from_millis(ms);
        }
        if let Some(ms) = self.min_length_ms {
            bounds.min_length = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_length_ms {
            bounds.max_length = Duration::from_millis(ms);
        }
    }
}

fn sample_len_to_duration(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(samples as f64 / sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_duration_follows_sample_rate() {
        let segment = Segment {
            index: 0,
            start_sample: 1_000,
            end_sample: 9_000,
        };
        assert_eq!(segment.duration(8_000), Duration::from_secs(1));
    }

    #[test]
    fn default_bounds_are_ten_and_fifteen_minutes() {
        let bounds = ChunkBounds::default();
        assert_eq!(bounds.min_length, Duration::from_secs(600));
        assert_eq!(bounds.max_length, Duration::from_secs(900));
    }

    #[test]
    fn runtime_config_overlays_defaults() {
        let json = r#"{
            "min_silence_ms": 1500,
            "silence_threshold_db": -40.0,
            "max_length_ms": 720000
        }"#;
        let runtime: RuntimeSplitConfig = serde_json::from_str(json).unwrap();
        runtime.validate().unwrap();

        let mut split = SplitConfig::default();
        let mut bounds = ChunkBounds::default();
        runtime.apply(&mut split, &mut bounds);

        assert_eq!(split.min_silence, Duration::from_millis(1_500));
        assert_eq!(split.silence_threshold_db, -40.0);
        assert_eq!(split.keep_silence, Duration::from_millis(500));
        assert_eq!(bounds.min_length, Duration::from_secs(600));
        assert_eq!(bounds.max_length, Duration::from_secs(720));
    }

    #[test]
    fn runtime_config_rejects_inverted_window() {
        let runtime = RuntimeSplitConfig {
            min_length_ms: Some(900_000),
            max_length_ms: Some(600_000),
            ..RuntimeSplitConfig::default()
        };
        assert!(runtime.validate().is_err());
    }

    #[test]
    fn runtime_config_rejects_positive_threshold() {
        let runtime = RuntimeSplitConfig {
            silence_threshold_db: Some(3.0),
            ..RuntimeSplitConfig::default()
        };
        assert!(runtime.validate().is_err());
    }
}
