//! Chunk refinement: repack silence-delimited segments into chunks whose
//! durations fall inside the configured window.
//!
//! The pass is a greedy forward merge. Segments accumulate until adding the
//! next one would push the chunk past `max_length`; the accumulator then
//! closes if it has reached `min_length`, and otherwise keeps merging, so
//! the floor wins over the ceiling when the two conflict. Chunks come out
//! in recording order and every input segment appears in exactly one chunk.

mod accumulator;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::types::{Chunk, ChunkBounds, Segment};

use accumulator::ChunkAccumulator;

/// Errors surfaced by [`refine_chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineError {
    /// The duration window is degenerate: a zero bound, or floor above ceiling
    InvalidBounds {
        min_length: Duration,
        max_length: Duration,
    },
    /// There are no segments to refine
    EmptyInput,
}

impl Display for RefineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RefineError::InvalidBounds {
                min_length,
                max_length,
            } => write!(
                f,
                "invalid bounds: min_length {:.3}s, max_length {:.3}s (both must be positive, floor must not exceed ceiling)",
                min_length.as_secs_f64(),
                max_length.as_secs_f64()
            ),
            RefineError::EmptyInput => write!(f, "no segments to refine"),
        }
    }
}

impl Error for RefineError {}

/// Repack `segments` into chunks whose durations lie within `bounds`.
///
/// Fails fast on a degenerate window or empty input; on success the output
/// chunks reference every segment exactly once, in order. All chunks reach
/// `min_length` except possibly the last, and all stay under `max_length`
/// except when a run of short segments has to absorb an oversized neighbour
/// to reach the floor. The trailing chunk is always emitted, whatever its
/// length.
pub fn refine_chunks(
    segments: &[Segment],
    sample_rate: u32,
    bounds: ChunkBounds,
) -> Result<Vec<Chunk>, RefineError> {
    if bounds.min_length.is_zero()
        || bounds.max_length.is_zero()
        || bounds.min_length > bounds.max_length
    {
        return Err(RefineError::InvalidBounds {
            min_length: bounds.min_length,
            max_length: bounds.max_length,
        });
    }
    if segments.is_empty() {
        return Err(RefineError::EmptyInput);
    }

    let mut accumulator = ChunkAccumulator::new(sample_rate);
    for segment in segments {
        accumulator.handle_segment(segment, bounds);
    }
    Ok(accumulator.into_chunks())
}
