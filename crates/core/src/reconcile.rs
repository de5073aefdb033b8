//! Attaches narration timing to conceptual segments.

use log::{debug, warn};

use crate::{
    alignment::{AlignedText, Span, normalize},
    error::SegmentAlignmentError,
    types::{CharacterTiming, ConceptualSegment, Script, SegmentTiming},
};

/// Final segments shorter than this are reported. Their start never moves
/// before the matched text.
pub const MIN_FINAL_SEGMENT_SECONDS: f64 = 2.0;

/// Fraction of the narration the segments must span before a gap is reported.
pub const COVERAGE_TOLERANCE: f64 = 0.98;

const PREVIEW_CHARS: usize = 50;

/// Returns a copy of `script` with timing on every conceptual segment.
///
/// `timings` must be indexed by characters of `script.raw_content`. Segments
/// are searched in order, each at or after the end of the previous match.
/// The last segment always ends at the final character's end time and keeps
/// its matched start.
pub fn reconcile(
    script: &Script,
    timings: &CharacterTiming,
) -> Result<Script, SegmentAlignmentError> {
    timings
        .check_lengths()
        .map_err(|reason| SegmentAlignmentError::InvalidTimings { reason })?;
    if timings.is_empty() {
        return Err(SegmentAlignmentError::EmptyTimings);
    }

    let text = AlignedText::new(&script.raw_content);
    let starts = &timings.character_start_times_seconds;
    let ends = &timings.character_end_times_seconds;
    let last_char = timings.len() - 1;
    let total_duration = timings.total_duration();

    debug!(
        "reconciling timings: raw_length={} normalized_length={} segments={} characters={} total_duration={total_duration:.3}",
        script.raw_content.chars().count(),
        text.normalized_len(),
        script.conceptual_segments.len(),
        timings.len(),
    );

    let count = script.conceptual_segments.len();
    let mut cursor = 0;
    let mut segments: Vec<ConceptualSegment> = Vec::with_capacity(count);

    for (position, segment) in script.conceptual_segments.iter().enumerate() {
        let is_last = position + 1 == count;
        let normalized = normalize(&segment.content);

        let span = if normalized.is_empty() {
            Span::empty(cursor)
        } else {
            let found = text.locate(&normalized, cursor).ok_or_else(|| {
                warn!(
                    "segment {} not found after normalized offset {cursor}",
                    segment.index
                );
                SegmentAlignmentError::NotFound {
                    index: segment.index,
                    preview: normalized.chars().take(PREVIEW_CHARS).collect(),
                }
            })?;
            found.span
        };
        cursor = span.end;

        let original = text.to_original(span);
        let start = starts[original.start.min(last_char)];
        let mut end = if original.is_empty() {
            start
        } else {
            ends[(original.end - 1).min(last_char)]
        };

        if is_last {
            end = total_duration;
            if end - start < MIN_FINAL_SEGMENT_SECONDS {
                debug!(
                    "final segment {} is short: {:.3}s from matched start {start:.3}",
                    segment.index,
                    end - start
                );
            }
        }
        // timings from the provider are not guaranteed monotonic
        let end = end.max(start);

        debug!(
            "segment {} timing: start={start:.3} end={end:.3} chars={}..{}",
            segment.index, original.start, original.end
        );

        segments.push(ConceptualSegment {
            timing: Some(SegmentTiming {
                start,
                end,
                duration: end - start,
                content_start: original.start,
                content_end: original.end,
            }),
            ..segment.clone()
        });
    }

    let covered = segments
        .iter()
        .filter_map(|s| s.timing.map(|t| t.end))
        .fold(0.0, f64::max);
    if covered < total_duration * COVERAGE_TOLERANCE {
        warn!(
            "timing coverage gap: total={total_duration:.3} covered={covered:.3} gap={:.3}",
            total_duration - covered
        );
    }

    Ok(Script {
        conceptual_segments: segments,
        character_timings: Some(timings.clone()),
        ..script.clone()
    })
}
