//! Time-bucket aggregation.
//!
//! Builds the complete, gap-free, zero-filled sequence of day or hour
//! buckets covering the lookback window (or an explicit zoomed range) and
//! counts matching items per bucket. Keys are canonical local-time strings
//! (`YYYY-MM-DD` / `YYYY-MM-DDTHH`) whose lexicographic order equals
//! chronological order, so they double as sort keys and range bounds.
//!
//! Bucket keys are always derived from the viewer's local calendar, never
//! UTC, so an event at 23:50 UTC lands on the next day for a viewer two
//! hours east. Windows crossing a daylight-saving transition may merge or
//! split an hour; that is accepted, not special-cased.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::filter::DateRange;
use crate::model::Timestamped;

/// Bucket width of an aggregated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Hour,
}

impl Granularity {
    /// Canonical key for a local datetime at this granularity.
    pub fn key(&self, at: NaiveDateTime) -> String {
        match self {
            Granularity::Day => at.format("%Y-%m-%d").to_string(),
            Granularity::Hour => at.format("%Y-%m-%dT%H").to_string(),
        }
    }

    /// Short axis label.
    pub fn label(&self, at: NaiveDateTime) -> String {
        match self {
            Granularity::Day => at.format("%b %d").to_string(),
            Granularity::Hour => at.format("%H:00").to_string(),
        }
    }

    /// Long display form.
    pub fn full_date(&self, at: NaiveDateTime) -> String {
        match self {
            Granularity::Day => at.format("%B %-d, %Y").to_string(),
            Granularity::Hour => at.format("%B %-d, %Y %H:00").to_string(),
        }
    }

    /// Number of buckets a lookback window of `days` spans at this
    /// granularity.
    pub fn window_units(&self, days: u32) -> u32 {
        match self {
            Granularity::Day => days,
            Granularity::Hour => days.saturating_mul(24),
        }
    }

    /// One bucket width.
    fn step(&self) -> Duration {
        match self {
            Granularity::Day => Duration::days(1),
            Granularity::Hour => Duration::hours(1),
        }
    }

    /// Align a local datetime down to the start of its bucket.
    fn align_down(&self, at: NaiveDateTime) -> NaiveDateTime {
        match self {
            Granularity::Day => at.date().and_time(NaiveTime::MIN),
            Granularity::Hour => at
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(at),
        }
    }

    /// Parse a canonical key back into the bucket's start datetime.
    pub fn parse_key(&self, key: &str) -> Option<NaiveDateTime> {
        match self {
            Granularity::Day => NaiveDate::parse_from_str(key, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
            Granularity::Hour => {
                NaiveDateTime::parse_from_str(&format!("{key}:00:00"), "%Y-%m-%dT%H:%M:%S").ok()
            }
        }
    }
}

/// One fixed-width time slot in an aggregated series.
///
/// Buckets are regenerated on every aggregation call; they carry no
/// persistent identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Canonical local-time key; lexicographic order is chronological.
    pub key: String,

    /// Short axis label ("Jun 08", "09:00").
    pub label: String,

    /// Number of items whose local-time key matched this bucket.
    pub count: u64,

    /// Long display form for tooltips.
    pub full_date: String,
}

/// Build the zero-filled bucket sequence for `items`.
///
/// Without an explicit `range`, the window starts `window_units - 1` whole
/// units before `now` (aligned down to the unit start in local time) and
/// runs through `now` inclusive. With a `range` whose precision matches
/// `granularity`, the sequence covers exactly that range so a zoomed chart
/// lines up with its selection.
///
/// Items keyed before the window start are skipped; they should already be
/// excluded by the lookback trim. Deterministic and idempotent: identical
/// inputs yield identical output.
pub fn bucket_series<T, Tz>(
    items: &[T],
    window_units: u32,
    granularity: Granularity,
    range: Option<&DateRange>,
    now: DateTime<Tz>,
) -> Vec<Bucket>
where
    T: Timestamped,
    Tz: TimeZone,
{
    let tz = now.timezone();
    let local_now = now.naive_local();

    let (start, end) = series_bounds(window_units, granularity, range, local_now);

    let mut buckets: Vec<Bucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut slot = start;
    while slot <= end {
        let key = granularity.key(slot);
        index.insert(key.clone(), buckets.len());
        buckets.push(Bucket {
            key,
            label: granularity.label(slot),
            count: 0,
            full_date: granularity.full_date(slot),
        });
        slot = slot + granularity.step();
    }

    for item in items {
        let local = item.timestamp().with_timezone(&tz).naive_local();
        let key = granularity.key(local);
        if let Some(&i) = index.get(&key) {
            buckets[i].count += 1;
        }
    }

    buckets
}

/// Resolve the first and last bucket starts for a series.
fn series_bounds(
    window_units: u32,
    granularity: Granularity,
    range: Option<&DateRange>,
    local_now: NaiveDateTime,
) -> (NaiveDateTime, NaiveDateTime) {
    if let Some(range) = range {
        if range.precision == granularity {
            if let (Some(start), Some(end)) = (
                granularity.parse_key(&range.start),
                granularity.parse_key(&range.end),
            ) {
                return if start <= end { (start, end) } else { (end, start) };
            }
        }
        // Mismatched precision or unparseable keys: fall back to the
        // full window rather than producing a broken series.
    }

    let end = granularity.align_down(local_now);
    let units = i64::from(window_units.max(1));
    let start = end - granularity.step() * (units - 1) as i32;
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[derive(Debug, Clone)]
    struct Stamp(DateTime<Utc>);

    impl Timestamped for Stamp {
        fn timestamp(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn stamp(s: &str) -> Stamp {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap();
        Stamp(naive.and_utc())
    }

    fn utc_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_seven_day_window_counts() {
        let alerts = vec![stamp("2024-06-08T10:00"), stamp("2024-06-09T23:50")];

        let buckets = bucket_series(&alerts, 7, Granularity::Day, None, utc_now());

        let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "2024-06-04",
                "2024-06-05",
                "2024-06-06",
                "2024-06-07",
                "2024-06-08",
                "2024-06-09",
                "2024-06-10",
            ]
        );

        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_bucket_completeness_any_window() {
        for n in [1u32, 3, 7, 30] {
            let buckets =
                bucket_series::<Stamp, _>(&[], n, Granularity::Day, None, utc_now());

            assert_eq!(buckets.len(), n as usize);
            for pair in buckets.windows(2) {
                assert!(pair[0].key < pair[1].key, "keys must strictly increase");
            }
            assert!(buckets.iter().all(|b| b.count == 0));
        }
    }

    #[test]
    fn test_hour_buckets_cover_window_inclusive() {
        let buckets = bucket_series::<Stamp, _>(
            &[],
            Granularity::Hour.window_units(1),
            Granularity::Hour,
            None,
            utc_now(),
        );

        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets.first().unwrap().key, "2024-06-09T13");
        assert_eq!(buckets.last().unwrap().key, "2024-06-10T12");
    }

    #[test]
    fn test_local_time_keys_shift_day_boundary() {
        // 23:50 UTC on the 9th is already the 10th for a viewer at +02:00.
        let now = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .unwrap();
        let alerts = vec![stamp("2024-06-09T23:50")];

        let buckets = bucket_series(&alerts, 7, Granularity::Day, None, now);

        let hit: Vec<&str> = buckets
            .iter()
            .filter(|b| b.count > 0)
            .map(|b| b.key.as_str())
            .collect();
        assert_eq!(hit, vec!["2024-06-10"]);
    }

    #[test]
    fn test_idempotent() {
        let alerts = vec![stamp("2024-06-08T10:00"), stamp("2024-06-09T23:50")];

        let first = bucket_series(&alerts, 7, Granularity::Day, None, utc_now());
        let second = bucket_series(&alerts, 7, Granularity::Day, None, utc_now());

        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_range_overrides_window() {
        let alerts = vec![stamp("2024-06-05T09:00"), stamp("2024-06-08T10:00")];
        let range = DateRange {
            start: "2024-06-05".to_string(),
            end: "2024-06-07".to_string(),
            precision: Granularity::Day,
        };

        let buckets = bucket_series(&alerts, 7, Granularity::Day, Some(&range), utc_now());

        let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-06-05", "2024-06-06", "2024-06-07"]);
        // The 06-08 alert falls outside the zoomed range and is skipped.
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 0]);
    }

    #[test]
    fn test_range_with_mismatched_precision_falls_back() {
        let range = DateRange {
            start: "2024-06-05".to_string(),
            end: "2024-06-07".to_string(),
            precision: Granularity::Day,
        };

        let buckets =
            bucket_series::<Stamp, _>(&[], 24, Granularity::Hour, Some(&range), utc_now());

        // Hour series ignores a day-precision range and covers the window.
        assert_eq!(buckets.len(), 24);
    }

    #[test]
    fn test_items_before_window_are_skipped() {
        let alerts = vec![stamp("2024-05-01T00:00"), stamp("2024-06-10T01:00")];

        let buckets = bucket_series(&alerts, 7, Granularity::Day, None, utc_now());

        let total: u64 = buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_hour_key_roundtrip() {
        let parsed = Granularity::Hour.parse_key("2024-06-10T09").unwrap();
        assert_eq!(Granularity::Hour.key(parsed), "2024-06-10T09");
    }
}
