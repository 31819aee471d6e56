use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chunkscribe::export;
use chunkscribe::pipeline::worker::{JobHandle, JobRequest, JobUpdate};
use chunkscribe::pipeline::{SplitRequest, TranscribeRequest};
use chunkscribe::transcription::ModelSize;
use chunkscribe::types::{ChunkBounds, RuntimeSplitConfig, SplitConfig};

/// Chunkscribe - silence-aware audio chunking and transcription
///
/// Splits a long recording into silence-bounded chunks of bounded duration
/// and transcribes each chunk with Whisper into one transcript file.
#[derive(Parser, Debug)]
#[command(name = "chunkscribe")]
#[command(version = "0.1.0")]
#[command(about = "Split long recordings on silence and transcribe them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a recording into silence-bounded, duration-bounded chunks
    Split(SplitArgs),
    /// Transcribe previously exported chunks into one transcript file
    Transcribe(TranscribeArgs),
    /// Split and transcribe in one pass
    Run(RunArgs),
    /// Convert an audio file to 16-bit WAV
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone)]
struct SplitOptions {
    /// Minimum chunk length (seconds, MM:SS or HH:MM:SS); default 10 minutes
    #[arg(long, value_name = "TIME")]
    min_length: Option<String>,

    /// Maximum chunk length (seconds, MM:SS or HH:MM:SS); default 15 minutes
    #[arg(long, value_name = "TIME")]
    max_length: Option<String>,

    /// Minimum silence that separates segments; default 2 seconds
    #[arg(long, value_name = "TIME")]
    min_silence: Option<String>,

    /// Silence threshold in dBFS; default -32
    #[arg(long, value_name = "DB")]
    silence_threshold: Option<f32>,

    /// Silence padding retained around each segment; default 0.5 seconds
    #[arg(long, value_name = "TIME")]
    keep_silence: Option<String>,

    /// Inline JSON splitter configuration
    #[arg(long, value_name = "JSON", conflicts_with = "config_file")]
    config_json: Option<String>,

    /// Path to a JSON splitter configuration file
    #[arg(long, value_name = "PATH", conflicts_with = "config_json")]
    config_file: Option<PathBuf>,
}

impl SplitOptions {
    /// Resolve defaults, then the JSON config, then explicit flags.
    fn resolve(&self) -> Result<(SplitConfig, ChunkBounds)> {
        let mut split = SplitConfig::default();
        let mut bounds = ChunkBounds::default();

        if let Some(runtime) =
            load_runtime_config(self.config_file.as_deref(), self.config_json.as_deref())?
        {
            runtime
                .validate()
                .context("splitter configuration validation failed")?;
            runtime.apply(&mut split, &mut bounds);
        }

        if let Some(raw) = self.min_length.as_deref() {
            bounds.min_length = parse_time(raw).context("invalid --min-length")?;
        }
        if let Some(raw) = self.max_length.as_deref() {
            bounds.max_length = parse_time(raw).context("invalid --max-length")?;
        }
        if let Some(raw) = self.min_silence.as_deref() {
            split.min_silence = parse_time(raw).context("invalid --min-silence")?;
        }
        if let Some(db) = self.silence_threshold {
            ensure!(
                db.is_finite() && db < 0.0,
                "--silence-threshold must be a negative dBFS value"
            );
            split.silence_threshold_db = db;
        }
        if let Some(raw) = self.keep_silence.as_deref() {
            split.keep_silence = parse_time(raw).context("invalid --keep-silence")?;
        }

        ensure!(
            !bounds.min_length.is_zero() && !bounds.max_length.is_zero(),
            "invalid bounds: chunk lengths must be positive"
        );
        ensure!(
            bounds.min_length <= bounds.max_length,
            "invalid bounds: min-length ({:.0}s) exceeds max-length ({:.0}s)",
            bounds.min_length.as_secs_f64(),
            bounds.max_length.as_secs_f64()
        );
        ensure!(
            !split.min_silence.is_zero(),
            "--min-silence must be positive"
        );

        Ok((split, bounds))
    }
}

#[derive(Args, Debug, Clone)]
struct ModelOptions {
    /// Whisper model size: tiny, base, small, medium or large
    #[arg(long, default_value = "base", value_name = "SIZE")]
    model: String,

    /// Path to a ggml model file (overrides --model and WHISPER_MODEL_PATH)
    #[arg(long, value_name = "PATH")]
    model_path: Option<PathBuf>,
}

impl ModelOptions {
    fn model_size(&self) -> Result<ModelSize> {
        self.model.parse()
    }
}

#[derive(Args, Debug, Clone)]
struct SplitArgs {
    /// Input audio file (MP3, OGG, FLAC, WAV, ...)
    #[arg(value_name = "INPUT")]
    input_file: PathBuf,

    /// Directory that receives the chunk<N>.wav files
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    #[command(flatten)]
    options: SplitOptions,
}

#[derive(Args, Debug, Clone)]
struct TranscribeArgs {
    /// Directory containing chunk<N>.wav files
    #[arg(value_name = "CHUNK_DIR")]
    chunk_dir: PathBuf,

    /// Transcript file to append to
    #[arg(value_name = "OUTPUT_TXT")]
    output_txt: PathBuf,

    #[command(flatten)]
    model: ModelOptions,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Input audio file (MP3, OGG, FLAC, WAV, ...)
    #[arg(value_name = "INPUT")]
    input_file: PathBuf,

    /// Directory that receives the chunk<N>.wav files
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Transcript file to append to
    #[arg(value_name = "OUTPUT_TXT")]
    output_txt: PathBuf,

    #[command(flatten)]
    options: SplitOptions,

    #[command(flatten)]
    model: ModelOptions,
}

#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    /// Input audio file
    #[arg(value_name = "INPUT")]
    input_file: PathBuf,

    /// Directory that receives the converted WAV
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Split(args) => handle_split(args),
        Command::Transcribe(args) => handle_transcribe(args),
        Command::Run(args) => handle_run(args),
        Command::Convert(args) => handle_convert(args),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

fn handle_split(args: SplitArgs) -> Result<()> {
    validate_input_file(&args.input_file)?;
    validate_output_dir(&args.output_dir)?;
    let (split, bounds) = args.options.resolve()?;

    let request = SplitRequest {
        input: args.input_file,
        output_dir: args.output_dir.clone(),
        split,
        bounds,
    };
    let terminal = run_job(JobRequest::Split(request))?;
    if let JobUpdate::Finished(summary) = terminal {
        println!(
            "\nDone: {} chunk files under {}",
            summary.chunk_files.len(),
            args.output_dir.display()
        );
    }
    Ok(())
}

fn handle_transcribe(args: TranscribeArgs) -> Result<()> {
    ensure!(
        args.chunk_dir.is_dir(),
        "chunk directory does not exist: {}",
        args.chunk_dir.display()
    );
    let request = TranscribeRequest {
        chunk_dir: args.chunk_dir,
        output_txt: args.output_txt.clone(),
        model: args.model.model_size()?,
        model_path: args.model.model_path.clone(),
    };
    let terminal = run_job(JobRequest::Transcribe(request))?;
    if matches!(terminal, JobUpdate::Finished(_)) {
        println!(
            "\nDone: transcript saved to {}",
            args.output_txt.display()
        );
    }
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<()> {
    validate_input_file(&args.input_file)?;
    validate_output_dir(&args.output_dir)?;
    let (split, bounds) = args.options.resolve()?;

    let split_request = SplitRequest {
        input: args.input_file,
        output_dir: args.output_dir.clone(),
        split,
        bounds,
    };
    let transcribe_request = TranscribeRequest {
        chunk_dir: args.output_dir,
        output_txt: args.output_txt.clone(),
        model: args.model.model_size()?,
        model_path: args.model.model_path.clone(),
    };
    let terminal = run_job(JobRequest::Full(split_request, transcribe_request))?;
    if matches!(terminal, JobUpdate::Finished(_)) {
        println!(
            "\nDone: transcript saved to {}",
            args.output_txt.display()
        );
    }
    Ok(())
}

fn handle_convert(args: ConvertArgs) -> Result<()> {
    validate_input_file(&args.input_file)?;
    validate_output_dir(&args.output_dir)?;
    let path = export::convert_to_wav(&args.input_file, &args.output_dir)?;
    println!("Converted {} to {}", args.input_file.display(), path.display());
    Ok(())
}

/// Spawn the job and print progress until it ends; failures become errors.
fn run_job(request: JobRequest) -> Result<JobUpdate> {
    let handle = JobHandle::spawn(request)?;
    let terminal = handle.wait_with(print_progress);
    match terminal {
        JobUpdate::Failed(err) => bail!("{err}"),
        JobUpdate::Cancelled => bail!("job was cancelled before it finished"),
        other => Ok(other),
    }
}

fn print_progress(update: &JobUpdate) {
    match update {
        JobUpdate::StageStarted { stage } => println!("\n=> {stage}"),
        JobUpdate::SegmentsFound { segments } => {
            println!("   found {segments} silence-delimited segments");
        }
        JobUpdate::ChunksPlanned { chunks } => println!("   planned {chunks} chunks"),
        JobUpdate::ChunkExported { index, total, path } => {
            println!("   wrote {} ({}/{})", path.display(), index + 1, total);
        }
        JobUpdate::ChunkTranscribed { index, total } => {
            println!("   transcribed chunk {}/{}", index + 1, total);
        }
        JobUpdate::Finished(_) | JobUpdate::Failed(_) | JobUpdate::Cancelled => {}
    }
}

fn validate_input_file(path: &Path) -> Result<()> {
    ensure!(path.exists(), "input file does not exist: {}", path.display());
    ensure!(path.is_file(), "input path is not a file: {}", path.display());
    Ok(())
}

fn validate_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        ensure!(
            path.is_dir(),
            "output path must be a directory: {}",
            path.display()
        );
    }
    Ok(())
}

fn load_runtime_config(
    file: Option<&Path>,
    json: Option<&str>,
) -> Result<Option<RuntimeSplitConfig>> {
    if let Some(path) = file {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let runtime = serde_json::from_str(&data).context("failed to parse config JSON")?;
        return Ok(Some(runtime));
    }
    if let Some(raw) = json {
        let runtime = serde_json::from_str(raw).context("failed to parse config JSON")?;
        return Ok(Some(runtime));
    }
    Ok(None)
}

/// Parse a duration given as seconds ("90", "12.5") or as MM:SS / HH:MM:SS.
fn parse_time(raw: &str) -> Result<Duration> {
    if raw.contains(':') {
        return parse_hms_time(raw);
    }
    let seconds: f64 = raw
        .parse()
        .with_context(|| format!("failed to parse seconds value '{raw}'"))?;
    ensure!(seconds >= 0.0, "time values must be non-negative");
    Ok(Duration::from_secs_f64(seconds))
}

fn parse_hms_time(raw: &str) -> Result<Duration> {
    let parts: Vec<&str> = raw.split(':').collect();
    ensure!(
        (2..=3).contains(&parts.len()),
        "time format must be MM:SS or HH:MM:SS"
    );

    let seconds = parts[parts.len() - 1]
        .parse::<f64>()
        .with_context(|| format!("invalid seconds component '{}'", parts[parts.len() - 1]))?;
    let minutes = parts[parts.len() - 2]
        .parse::<f64>()
        .with_context(|| format!("invalid minutes component '{}'", parts[parts.len() - 2]))?;
    ensure!(minutes >= 0.0, "minutes must be non-negative");
    ensure!(seconds >= 0.0, "seconds must be non-negative");

    let hours = if parts.len() == 3 {
        let value = parts[0]
            .parse::<f64>()
            .with_context(|| format!("invalid hours component '{}'", parts[0]))?;
        ensure!(value >= 0.0, "hours must be non-negative");
        value
    } else {
        0.0
    };

    Ok(Duration::from_secs_f64(hours * 3600.0 + minutes * 60.0 + seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_time_seconds() {
        assert_eq!(parse_time("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_time("12.5").unwrap(), Duration::from_secs_f64(12.5));
    }

    #[test]
    fn parse_time_hms() {
        let parsed = parse_time("01:02:03.5").unwrap();
        let expected = 3600.0 + 120.0 + 3.5;
        assert!((parsed.as_secs_f64() - expected).abs() < 1e-6);
        assert_eq!(parse_time("10:00").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert!(parse_time("ten minutes").is_err());
        assert!(parse_time("1:2:3:4").is_err());
    }

    #[test]
    fn resolve_applies_flags_over_json() {
        let options = SplitOptions {
            min_length: Some("5:00".to_string()),
            max_length: None,
            min_silence: None,
            silence_threshold: Some(-40.0),
            keep_silence: None,
            config_json: Some(r#"{"min_length_ms": 480000, "max_length_ms": 600000}"#.to_string()),
            config_file: None,
        };
        let (split, bounds) = options.resolve().unwrap();
        // flag wins over the JSON floor; the JSON ceiling stands
        assert_eq!(bounds.min_length, Duration::from_secs(300));
        assert_eq!(bounds.max_length, Duration::from_secs(600));
        assert_eq!(split.silence_threshold_db, -40.0);
    }

    #[test]
    fn resolve_rejects_inverted_bounds() {
        let options = SplitOptions {
            min_length: Some("20:00".to_string()),
            max_length: Some("10:00".to_string()),
            min_silence: None,
            silence_threshold: None,
            keep_silence: None,
            config_json: None,
            config_file: None,
        };
        let err = options.resolve().unwrap_err();
        assert!(err.to_string().contains("invalid bounds"));
    }
}
