use crate::types::{AudioData, Chunk, Segment};

/// Materialize a chunk by concatenating its segments' sample ranges.
pub fn materialize_chunk(audio: &AudioData, segments: &[Segment], chunk: &Chunk) -> AudioData {
    let capacity: usize = chunk
        .segment_indices
        .iter()
        .filter_map(|&index| segments.get(index))
        .map(Segment::sample_len)
        .sum();
    let mut samples = Vec::with_capacity(capacity);

    for &index in &chunk.segment_indices {
        let Some(segment) = segments.get(index) else {
            continue;
        };
        let start = segment.start_sample.min(audio.samples.len());
        let end = segment.end_sample.min(audio.samples.len());
        samples.extend_from_slice(&audio.samples[start..end]);
    }

    AudioData {
        samples,
        sample_rate: audio.sample_rate,
    }
}
