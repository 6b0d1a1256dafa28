//! Filter state: the active facets narrowing the dashboard.
//!
//! A facet is one independent filter dimension (country, scenario, AS, IP,
//! target, date range). Each holds at most one value; facets combine with
//! logical AND. Setting a facet to its already-active value clears it
//! (toggle semantics). The whole record round-trips through serde so it can
//! be persisted across sessions; a corrupt stored snapshot fails soft to
//! the default state at the store layer.

use serde::{Deserialize, Serialize};

use crate::buckets::Granularity;

/// A selected date range, tagged with the precision its keys were minted
/// at. Keys of different precisions are not comparable, so switching
/// granularity always discards the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First bucket key in the selection (inclusive).
    pub start: String,

    /// Last bucket key in the selection (inclusive).
    pub end: String,

    /// Granularity the keys were minted at.
    pub precision: Granularity,
}

impl DateRange {
    /// Whether a key at this range's precision falls inside the range.
    /// Lexicographic comparison is chronological for canonical keys.
    pub fn contains(&self, key: &str) -> bool {
        self.start.as_str() <= key && key <= self.end.as_str()
    }
}

/// One of the single-valued facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Country,
    Scenario,
    As,
    Ip,
    Target,
}

/// The active facets. Created with everything unset; mutated by toggle and
/// reset operations; never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Active date-range selection, if any.
    pub date_range: Option<DateRange>,

    /// True when the range is anchored to the newest bucket and should
    /// slide forward as data refreshes instead of freezing in place.
    pub range_sticky: bool,

    pub country: Option<String>,
    pub scenario: Option<String>,
    pub as_name: Option<String>,
    pub ip: Option<String>,
    pub target: Option<String>,
}

impl FilterState {
    /// Select `value` on `facet`, or clear the facet if `value` is already
    /// selected.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        let slot = match facet {
            Facet::Country => &mut self.country,
            Facet::Scenario => &mut self.scenario,
            Facet::As => &mut self.as_name,
            Facet::Ip => &mut self.ip,
            Facet::Target => &mut self.target,
        };

        if slot.as_deref() == Some(value) {
            *slot = None;
        } else {
            *slot = Some(value.to_string());
        }
    }

    /// Clear every facet, returning to the initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Install a date-range selection.
    pub fn set_range(&mut self, range: DateRange, sticky: bool) {
        self.date_range = Some(range);
        self.range_sticky = sticky;
    }

    /// Drop any date-range selection.
    pub fn clear_range(&mut self) {
        self.date_range = None;
        self.range_sticky = false;
    }

    /// True when no facet is active.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
