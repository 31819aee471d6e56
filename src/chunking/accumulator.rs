use std::time::Duration;

use crate::types::{Chunk, ChunkBounds, Segment};

pub(super) struct ChunkAccumulator {
    sample_rate: u32,
    chunks: Vec<Chunk>,
    current_indices: Vec<usize>,
    current_duration: Duration,
}

impl ChunkAccumulator {
    pub(super) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            chunks: Vec::new(),
            current_indices: Vec::new(),
            current_duration: Duration::ZERO,
        }
    }

    pub(super) fn handle_segment(&mut self, segment: &Segment, bounds: ChunkBounds) {
        let duration = segment.duration(self.sample_rate);
        if self.current_indices.is_empty() {
            self.attach(segment, duration);
            return;
        }
        if self.current_duration + duration <= bounds.max_length {
            self.attach(segment, duration);
        } else if self.current_duration >= bounds.min_length {
            self.finish_chunk();
            self.attach(segment, duration);
        } else {
            // Still short of the floor: keep merging even though the chunk
            // will overshoot the ceiling.
            self.attach(segment, duration);
        }
    }

    pub(super) fn finish_chunk(&mut self) {
        if self.current_indices.is_empty() {
            return;
        }
        self.chunks.push(Chunk {
            segment_indices: std::mem::take(&mut self.current_indices),
            duration: self.current_duration,
        });
        self.current_duration = Duration::ZERO;
    }

    /// The trailing accumulator is always flushed, whatever its length.
    pub(super) fn into_chunks(mut self) -> Vec<Chunk> {
        self.finish_chunk();
        self.chunks
    }

    fn attach(&mut self, segment: &Segment, duration: Duration) {
        self.current_indices.push(segment.index);
        self.current_duration += duration;
    }
}
