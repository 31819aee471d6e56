//! Chunk export: deterministic per-chunk WAV files.
//!
//! Files are named `chunk<index>.wav` with the index ascending from 0 in
//! output order, so re-exporting the same input reproduces the same tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::audio::{decoder, encoder, slicer};
use crate::types::{AudioData, Chunk, Segment};

/// File name for the chunk at `index`.
pub fn chunk_file_name(index: usize) -> String {
    format!("chunk{index}.wav")
}

/// Write a single chunk to `out_dir`; returns the path written.
pub fn write_chunk(
    audio: &AudioData,
    segments: &[Segment],
    chunk: &Chunk,
    index: usize,
    out_dir: &Path,
) -> Result<PathBuf> {
    let path = out_dir.join(chunk_file_name(index));
    let chunk_audio = slicer::materialize_chunk(audio, segments, chunk);
    encoder::encode_wav(&chunk_audio, &path)
        .with_context(|| format!("failed to write chunk {} to {}", index, path.display()))?;
    info!(
        index,
        duration_secs = chunk.duration.as_secs_f64(),
        path = %path.display(),
        "wrote chunk"
    );
    Ok(path)
}

/// Write every chunk to `out_dir`.
pub fn export_chunks(
    audio: &AudioData,
    segments: &[Segment],
    chunks: &[Chunk],
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| write_chunk(audio, segments, chunk, index, out_dir))
        .collect()
}

/// Chunk files under `dir`, ordered by their index. Files that do not match
/// the `chunk<index>.wav` scheme are ignored.
pub fn collect_chunk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read chunk directory {}", dir.display()))?;

    let mut indexed = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to list chunk directory {}", dir.display()))?;
        let path = entry.path();
        if let Some(index) = parse_chunk_index(&path) {
            indexed.push((index, path));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}

fn parse_chunk_index(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix("chunk")?.strip_suffix(".wav")?.parse().ok()
}

/// Decode any supported input and rewrite it as `<stem>.wav` under `out_dir`.
pub fn convert_to_wav(input: &Path, out_dir: &Path) -> Result<PathBuf> {
    let audio = decoder::decode_audio(input)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("converted");
    let path = out_dir.join(format!("{stem}.wav"));
    encoder::encode_wav(&audio, &path)
        .with_context(|| format!("failed to write converted audio to {}", path.display()))?;
    info!(input = %input.display(), output = %path.display(), "converted to WAV");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_zero_indexed() {
        assert_eq!(chunk_file_name(0), "chunk0.wav");
        assert_eq!(chunk_file_name(12), "chunk12.wav");
    }

    #[test]
    fn collect_orders_by_numeric_index() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["chunk10.wav", "chunk2.wav", "chunk0.wav", "notes.txt"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let files = collect_chunk_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["chunk0.wav", "chunk2.wav", "chunk10.wav"]);
    }

    #[test]
    fn collect_ignores_non_matching_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["chunkX.wav", "chunk1.mp3", "chunk3.wav"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let files = collect_chunk_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("chunk3.wav"));
    }
}
