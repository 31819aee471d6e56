//! Background job runtime.
//!
//! Runs a pipeline job on a named worker thread, streaming progress updates
//! over a channel. Cancellation is cooperative: the worker checks the shared
//! token between stages and between per-chunk steps, so a cancelled job
//! stops at the next unit boundary instead of mid-write.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::export;
use crate::transcription::{self, Transcriber};

use super::{decode_stage, refine_stage, split_stage};
use super::{CancelToken, SplitRequest, Stage, StageError, TranscribeRequest};

/// A unit of background work.
#[derive(Debug, Clone)]
pub enum JobRequest {
    Split(SplitRequest),
    Transcribe(TranscribeRequest),
    /// Split, then transcribe the chunks that were just produced.
    Full(SplitRequest, TranscribeRequest),
}

/// Progress and terminal updates emitted by a running job. Exactly one
/// terminal update (`Finished`, `Failed` or `Cancelled`) ends the stream.
#[derive(Debug, Clone)]
pub enum JobUpdate {
    StageStarted {
        stage: Stage,
    },
    SegmentsFound {
        segments: usize,
    },
    ChunksPlanned {
        chunks: usize,
    },
    ChunkExported {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    ChunkTranscribed {
        index: usize,
        total: usize,
    },
    Finished(JobSummary),
    Failed(StageError),
    Cancelled,
}

impl JobUpdate {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobUpdate::Finished(_) | JobUpdate::Failed(_) | JobUpdate::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobSummary {
    pub chunk_files: Vec<PathBuf>,
    pub transcript: Option<PathBuf>,
}

enum Flow {
    Complete(JobSummary),
    Cancelled,
}

pub struct JobHandle {
    cancel: CancelToken,
    updates: Receiver<JobUpdate>,
    join: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Spawn `request` on a worker thread and return a handle to it.
    pub fn spawn(request: JobRequest) -> Result<Self> {
        let (update_tx, updates) = channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let join = thread::Builder::new()
            .name("chunkscribe-job".to_string())
            .spawn(move || run_job(request, &worker_cancel, &update_tx))
            .context("failed to spawn job worker thread")?;
        Ok(Self {
            cancel,
            updates,
            join: Some(join),
        })
    }

    /// Request cooperative cancellation; the job stops at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking poll for the next update.
    pub fn try_recv(&self) -> Option<JobUpdate> {
        self.updates.try_recv().ok()
    }

    /// Block until the job reaches a terminal update, passing every update
    /// (terminal included) to `observer`. Returns the terminal update.
    pub fn wait_with(mut self, mut observer: impl FnMut(&JobUpdate)) -> JobUpdate {
        let mut last_stage = Stage::Decode;
        let mut terminal = None;
        while let Ok(update) = self.updates.recv() {
            if let JobUpdate::StageStarted { stage } = &update {
                last_stage = *stage;
            }
            observer(&update);
            if update.is_terminal() {
                terminal = Some(update);
                break;
            }
        }
        self.join_worker();
        terminal.unwrap_or_else(|| {
            JobUpdate::Failed(StageError::new(
                last_stage,
                "job worker exited before reporting a result",
            ))
        })
    }

    fn join_worker(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.join_worker();
    }
}

fn run_job(request: JobRequest, cancel: &CancelToken, updates: &Sender<JobUpdate>) {
    let outcome = match request {
        JobRequest::Split(split) => run_split(&split, cancel, updates),
        JobRequest::Transcribe(transcribe) => run_transcribe(&transcribe, None, cancel, updates),
        JobRequest::Full(split, transcribe) => match run_split(&split, cancel, updates) {
            Ok(Flow::Complete(summary)) => run_transcribe(
                &transcribe,
                Some(summary.chunk_files),
                cancel,
                updates,
            ),
            other => other,
        },
    };

    let terminal = match outcome {
        Ok(Flow::Complete(summary)) => JobUpdate::Finished(summary),
        Ok(Flow::Cancelled) => {
            info!("job cancelled");
            JobUpdate::Cancelled
        }
        Err(err) => {
            error!(stage = %err.stage, error = %err, "job failed");
            JobUpdate::Failed(err)
        }
    };
    let _ = updates.send(terminal);
}

fn run_split(
    request: &SplitRequest,
    cancel: &CancelToken,
    updates: &Sender<JobUpdate>,
) -> Result<Flow, StageError> {
    if cancel.is_cancelled() {
        return Ok(Flow::Cancelled);
    }

    send(updates, JobUpdate::StageStarted { stage: Stage::Decode });
    let audio = decode_stage(&request.input)?;
    if cancel.is_cancelled() {
        return Ok(Flow::Cancelled);
    }

    send(updates, JobUpdate::StageStarted { stage: Stage::Split });
    let segments = split_stage(&audio, &request.split);
    send(
        updates,
        JobUpdate::SegmentsFound {
            segments: segments.len(),
        },
    );

    send(updates, JobUpdate::StageStarted { stage: Stage::Refine });
    let chunks = refine_stage(&segments, audio.sample_rate, request.bounds)?;
    send(
        updates,
        JobUpdate::ChunksPlanned {
            chunks: chunks.len(),
        },
    );

    send(updates, JobUpdate::StageStarted { stage: Stage::Export });
    fs::create_dir_all(&request.output_dir).map_err(|err| {
        StageError::new(
            Stage::Export,
            format!(
                "failed to create output directory {}: {err}",
                request.output_dir.display()
            ),
        )
    })?;

    let total = chunks.len();
    let mut chunk_files = Vec::with_capacity(total);
    for (index, chunk) in chunks.iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let path = export::write_chunk(&audio, &segments, chunk, index, &request.output_dir)
            .map_err(|err| StageError::from_anyhow(Stage::Export, &err))?;
        send(
            updates,
            JobUpdate::ChunkExported {
                index,
                total,
                path: path.clone(),
            },
        );
        chunk_files.push(path);
    }

    Ok(Flow::Complete(JobSummary {
        chunk_files,
        transcript: None,
    }))
}

fn run_transcribe(
    request: &TranscribeRequest,
    chunk_files: Option<Vec<PathBuf>>,
    cancel: &CancelToken,
    updates: &Sender<JobUpdate>,
) -> Result<Flow, StageError> {
    if cancel.is_cancelled() {
        return Ok(Flow::Cancelled);
    }

    send(
        updates,
        JobUpdate::StageStarted {
            stage: Stage::Transcribe,
        },
    );
    let model_path =
        transcription::resolve_model_path(request.model, request.model_path.as_deref());
    let transcriber = Transcriber::new(&model_path)
        .map_err(|err| StageError::from_anyhow(Stage::Transcribe, &err))?;

    let files = match chunk_files {
        Some(files) => files,
        None => export::collect_chunk_files(&request.chunk_dir)
            .map_err(|err| StageError::from_anyhow(Stage::Transcribe, &err))?,
    };
    if files.is_empty() {
        return Err(StageError::new(
            Stage::Transcribe,
            format!("no chunk files found under {}", request.chunk_dir.display()),
        ));
    }

    let total = files.len();
    for (index, path) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let text = transcriber
            .transcribe_file(path)
            .map_err(|err| StageError::from_anyhow(Stage::Transcribe, &err))?;
        transcription::append_transcript(&request.output_txt, &text)
            .map_err(|err| StageError::from_anyhow(Stage::Transcribe, &err))?;
        send(updates, JobUpdate::ChunkTranscribed { index, total });
    }

    Ok(Flow::Complete(JobSummary {
        chunk_files: files,
        transcript: Some(request.output_txt.clone()),
    }))
}

// The receiver may be gone if the caller dropped the handle; the job keeps
// its own cancellation signal for that case.
fn send(updates: &Sender<JobUpdate>, update: JobUpdate) {
    let _ = updates.send(update);
}
