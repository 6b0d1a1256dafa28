//! Brush-gesture resolution.
//!
//! A drag on the slider reports a pair of indices into the slider's own
//! bucket sequence. This module turns that pair into a date-range filter
//! action: a span covering the whole sequence means "reset to unselected",
//! anything else selects the corresponding bucket keys. A selection whose
//! end lands on the newest bucket is sticky: on the next refresh it
//! re-anchors to the latest buckets instead of freezing at an absolute
//! timestamp.

use crate::buckets::{Bucket, Granularity};
use crate::filter::DateRange;

/// Outcome of resolving a brush gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrushOutcome {
    /// Reset to the unselected state (full window shown).
    Clear,

    /// Select a concrete range. `sticky` is true exactly when the end
    /// index is the last bucket of the sequence.
    Select { range: DateRange, sticky: bool },
}

/// Map a drag's index pair onto `buckets`.
///
/// Indices are normalized first: swapped if reversed, clamped to the
/// sequence. An empty sequence or a span covering the entire sequence
/// resolves to [`BrushOutcome::Clear`].
pub fn resolve_brush(
    start_index: usize,
    end_index: usize,
    buckets: &[Bucket],
    granularity: Granularity,
) -> BrushOutcome {
    if buckets.is_empty() {
        return BrushOutcome::Clear;
    }

    let last = buckets.len() - 1;
    let (lo, hi) = if start_index <= end_index {
        (start_index, end_index)
    } else {
        (end_index, start_index)
    };
    let lo = lo.min(last);
    let hi = hi.min(last);

    // Selecting everything is a reset, not an explicit full-range filter.
    if lo == 0 && hi == last {
        return BrushOutcome::Clear;
    }

    BrushOutcome::Select {
        range: DateRange {
            start: buckets[lo].key.clone(),
            end: buckets[hi].key.clone(),
            precision: granularity,
        },
        sticky: hi == last,
    }
}

/// Re-anchor a sticky range against a freshly generated bucket sequence:
/// keep the span length, slide the end to the newest bucket. Returns
/// `None` when the sequence is empty or the span now covers everything,
/// which both mean "unselected".
pub fn reanchor_sticky(range: &DateRange, buckets: &[Bucket]) -> Option<DateRange> {
    if buckets.is_empty() {
        return None;
    }

    let start = range.precision.parse_key(&range.start)?;
    let end = range.precision.parse_key(&range.end)?;
    let span_units = match range.precision {
        Granularity::Day => (end - start).num_days(),
        Granularity::Hour => (end - start).num_hours(),
    };
    let span_units = usize::try_from(span_units.max(0)).ok()?;

    let last = buckets.len() - 1;
    if span_units >= last {
        return None;
    }

    let lo = last - span_units;
    Some(DateRange {
        start: buckets[lo].key.clone(),
        end: buckets[last].key.clone(),
        precision: range.precision,
    })
}
