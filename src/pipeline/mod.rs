//! Pipeline stages and the background worker that runs them.
//!
//! Stage functions are synchronous and pure where possible; `worker` runs
//! them on a dedicated thread with progress updates and cooperative
//! cancellation. Failures carry the stage they happened in so an operator
//! can retry just that stage.

pub mod worker;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::audio::{decoder, splitter};
use crate::chunking;
use crate::transcription::ModelSize;
use crate::types::{AudioData, Chunk, ChunkBounds, Segment, SplitConfig};

/// Pipeline stages, named so failures can be attributed and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Split,
    Refine,
    Export,
    Transcribe,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Split => "split",
            Stage::Refine => "refine",
            Stage::Export => "export",
            Stage::Transcribe => "transcribe",
        };
        write!(f, "{name}")
    }
}

/// A failure attributed to a single pipeline stage.
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: Stage,
    message: Arc<str>,
}

impl StageError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: Arc::from(message.into()),
        }
    }

    pub fn from_anyhow(stage: Stage, error: &anyhow::Error) -> Self {
        Self::new(stage, format!("{error:#}"))
    }
}

impl Display for StageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.message)
    }
}

impl Error for StageError {}

/// Cooperative cancellation flag shared with a running job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Everything the split stage needs.
#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub split: SplitConfig,
    pub bounds: ChunkBounds,
}

/// Everything the transcribe stage needs.
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    pub chunk_dir: PathBuf,
    pub output_txt: PathBuf,
    pub model: ModelSize,
    pub model_path: Option<PathBuf>,
}

pub(crate) fn decode_stage(input: &Path) -> Result<AudioData, StageError> {
    let audio = decoder::decode_audio(input)
        .map_err(|err| StageError::from_anyhow(Stage::Decode, &err))?;
    info!(
        input = %input.display(),
        samples = audio.samples.len(),
        sample_rate = audio.sample_rate,
        "decoded input audio"
    );
    Ok(audio)
}

pub(crate) fn split_stage(audio: &AudioData, config: &SplitConfig) -> Vec<Segment> {
    let segments = splitter::split_on_silence(audio, config);
    info!(
        segments = segments.len(),
        total_secs = audio.duration().as_secs_f64(),
        "silence split complete"
    );
    segments
}

pub(crate) fn refine_stage(
    segments: &[Segment],
    sample_rate: u32,
    bounds: ChunkBounds,
) -> Result<Vec<Chunk>, StageError> {
    let chunks = chunking::refine_chunks(segments, sample_rate, bounds)
        .map_err(|err| StageError::new(Stage::Refine, err.to_string()))?;
    info!(chunks = chunks.len(), "chunk refinement complete");
    Ok(chunks)
}
