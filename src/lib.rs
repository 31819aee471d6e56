//! chunkscribe: silence-aware audio chunking and Whisper transcription.
//!
//! A long recording is decoded, split on silence into segments, repacked
//! into duration-bounded chunks, exported as numbered WAV files, and
//! transcribed chunk by chunk into a single transcript file.

pub mod audio;
pub mod chunking;
pub mod export;
pub mod pipeline;
pub mod transcription;
pub mod types;
