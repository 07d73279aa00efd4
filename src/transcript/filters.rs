//! Segment reduction filters.
//!
//! Stages always run in the same order, whatever order the query parameters came in:
//! truncate by time, subsample, merge adjacent segments, limit.

use super::TranscriptSegment;
use crate::utils::round2;

/// Optional knobs for reducing the number of returned segments
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterParameters {
    /// Keep at most this many segments (applied last)
    pub limit: Option<usize>,

    /// Merge every N consecutive segments into one
    pub merge_every: Option<usize>,

    /// Only keep segments starting before this many seconds
    pub max_duration: Option<f64>,

    /// Keep every Nth segment
    pub sample_every: Option<usize>,
}

impl FilterParameters {
    pub fn is_noop(&self) -> bool {
        self.limit.is_none()
            && self.merge_every.map_or(true, |n| n <= 1)
            && self.max_duration.is_none()
            && self.sample_every.map_or(true, |n| n <= 1)
    }
}

/// Run every configured stage over the segments
pub fn apply_segment_filters(
    segments: Vec<TranscriptSegment>,
    params: &FilterParameters,
) -> Vec<TranscriptSegment> {
    let mut segments = segments;

    if let Some(max_duration) = params.max_duration {
        segments = truncate_by_time(segments, max_duration);
    }

    if let Some(step) = params.sample_every.filter(|n| *n > 1) {
        segments = subsample(segments, step);
    }

    if let Some(batch) = params.merge_every.filter(|n| *n > 1) {
        segments = merge_adjacent(&segments, batch);
    }

    if let Some(limit) = params.limit {
        segments.truncate(limit);
    }

    segments
}

/// Keep segments that start strictly before `max_duration`
pub fn truncate_by_time(segments: Vec<TranscriptSegment>, max_duration: f64) -> Vec<TranscriptSegment> {
    segments
        .into_iter()
        .filter(|segment| segment.start < max_duration)
        .collect()
}

/// Keep every `step`-th segment, starting with the first
pub fn subsample(segments: Vec<TranscriptSegment>, step: usize) -> Vec<TranscriptSegment> {
    segments.into_iter().step_by(step.max(1)).collect()
}

/// Merge consecutive batches of `batch_size` segments; a trailing partial batch is merged too
pub fn merge_adjacent(segments: &[TranscriptSegment], batch_size: usize) -> Vec<TranscriptSegment> {
    segments
        .chunks(batch_size.max(1))
        .filter_map(merge_batch)
        .collect()
}

fn merge_batch(batch: &[TranscriptSegment]) -> Option<TranscriptSegment> {
    let first = batch.first()?;
    let last = batch.last()?;

    let text = batch
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(TranscriptSegment {
        text,
        start: round2(first.start),
        duration: round2(last.end - first.start),
        end: round2(last.end),
    })
}
