//! Speech-to-text via whisper.cpp (whisper-rs).
//!
//! Loads a ggml model once and runs greedy sampling per chunk; chunk texts
//! are appended to a single transcript file separated by blank lines.

use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{decoder, resample};
use crate::export;
use crate::types::AudioData;

/// Whisper expects 16 kHz mono input.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Separator written between per-chunk transcriptions.
pub const CHUNK_DELIMITER: &str = "\n\n\n\n";

/// Whisper model sizes; larger is slower and more accurate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn file_name(self) -> &'static str {
        match self {
            ModelSize::Tiny => "ggml-tiny.bin",
            ModelSize::Base => "ggml-base.bin",
            ModelSize::Small => "ggml-small.bin",
            ModelSize::Medium => "ggml-medium.bin",
            ModelSize::Large => "ggml-large.bin",
        }
    }
}

impl Display for ModelSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            other => bail!("unknown model size '{other}' (expected tiny, base, small, medium or large)"),
        }
    }
}

/// Locate the ggml model file: an explicit override beats the
/// `WHISPER_MODEL_PATH` environment variable, which beats
/// `./models/<file>`.
pub fn resolve_model_path(size: ModelSize, override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = std::env::var("WHISPER_MODEL_PATH") {
        return PathBuf::from(env_path);
    }
    Path::new("models").join(size.file_name())
}

pub struct Transcriber {
    ctx: WhisperContext,
}

impl Transcriber {
    pub fn new(model_path: &Path) -> Result<Self> {
        info!(model = %model_path.display(), "loading whisper model");
        let path_str = model_path
            .to_str()
            .context("model path is not valid UTF-8")?;
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .with_context(|| {
                format!(
                    "failed to load whisper model at {} (download with: wget \
                     https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin -P ./models/)",
                    model_path.display()
                )
            })?;
        Ok(Self { ctx })
    }

    /// Transcribe decoded audio; returns the concatenated segment text.
    pub fn transcribe(&self, audio: &AudioData) -> Result<String> {
        let samples =
            resample::linear_resample(&audio.samples, audio.sample_rate, WHISPER_SAMPLE_RATE)?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;
        state
            .full(params, &samples)
            .context("failed to run whisper inference")?;

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(segment.to_str().context("failed to read segment text")?);
        }
        Ok(text.trim().to_string())
    }

    pub fn transcribe_file(&self, path: &Path) -> Result<String> {
        let audio = decoder::decode_audio(path)
            .with_context(|| format!("failed to decode chunk file {}", path.display()))?;
        self.transcribe(&audio)
            .with_context(|| format!("transcription failed for chunk file {}", path.display()))
    }

    /// Transcribe `files` in the given order, appending each chunk's text to
    /// `output`.
    pub fn transcribe_files(&self, files: &[PathBuf], output: &Path) -> Result<()> {
        for path in files {
            let text = self.transcribe_file(path)?;
            append_transcript(output, &text)?;
            info!(chunk = %path.display(), chars = text.len(), "chunk transcribed");
        }
        Ok(())
    }

    /// Transcribe every `chunk<i>.wav` under `dir` in ascending index order.
    pub fn transcribe_directory(&self, dir: &Path, output: &Path) -> Result<()> {
        let files = export::collect_chunk_files(dir)?;
        if files.is_empty() {
            bail!("no chunk files found under {}", dir.display());
        }
        self.transcribe_files(&files, output)
    }
}

/// Append one chunk's text plus the blank-line delimiter.
pub fn append_transcript(output: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .with_context(|| format!("failed to open transcript file {}", output.display()))?;
    file.write_all(text.as_bytes())
        .and_then(|_| file.write_all(CHUNK_DELIMITER.as_bytes()))
        .with_context(|| format!("failed to write transcript file {}", output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_sizes_parse_and_map_to_files() {
        let size: ModelSize = "medium".parse().unwrap();
        assert_eq!(size, ModelSize::Medium);
        assert_eq!(size.file_name(), "ggml-medium.bin");
        assert!("enormous".parse::<ModelSize>().is_err());
    }

    #[test]
    fn explicit_model_path_wins() {
        let resolved =
            resolve_model_path(ModelSize::Base, Some(Path::new("/opt/models/custom.bin")));
        assert_eq!(resolved, PathBuf::from("/opt/models/custom.bin"));
    }

    #[test]
    fn transcript_chunks_are_appended_in_order_with_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("transcript.txt");

        append_transcript(&output, "first chunk").unwrap();
        append_transcript(&output, "second chunk").unwrap();

        let contents = std::fs::read_to_string(&output).unwrap();
        assert_eq!(contents, "first chunk\n\n\n\nsecond chunk\n\n\n\n");
    }

    #[test]
    #[ignore] // requires a downloaded ggml model
    fn transcribe_silence_with_real_model() {
        let model = resolve_model_path(ModelSize::Base, None);
        let transcriber = Transcriber::new(&model).unwrap();
        let audio = AudioData {
            samples: vec![0.0; WHISPER_SAMPLE_RATE as usize],
            sample_rate: WHISPER_SAMPLE_RATE,
        };
        let _text = transcriber.transcribe(&audio).unwrap();
    }
}
