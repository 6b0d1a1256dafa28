//! Lookback-window trimming.
//!
//! The dashboard only considers data inside a trailing window of N days,
//! anchored at the moment of invocation. Trimming happens before any
//! filtering or aggregation so every downstream view agrees on what
//! "current" means.

use chrono::{DateTime, Duration, Utc};

use crate::model::Timestamped;

/// Keep the items whose timestamp falls within the last `lookback_days`
/// whole days before `now`. Pure, order-preserving, O(n).
pub fn trim_to_window<T>(items: &[T], lookback_days: u32, now: DateTime<Utc>) -> Vec<T>
where
    T: Timestamped + Clone,
{
    let cutoff = now - Duration::days(i64::from(lookback_days));

    items
        .iter()
        .filter(|item| item.timestamp() >= cutoff)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    #[derive(Debug, Clone, PartialEq)]
    struct Stamp(DateTime<Utc>);

    impl Timestamped for Stamp {
        fn timestamp(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn at(s: &str) -> Stamp {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        Stamp(naive.and_utc())
    }

    #[test]
    fn test_trim_keeps_items_inside_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let items = vec![
            at("2024-06-10 10:00"),
            at("2024-06-04 10:00"),
            at("2024-06-03 11:59"), // just outside: cutoff is 06-03 12:00
        ];

        let kept = trim_to_window(&items, 7, now);

        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_trim_drops_items_before_cutoff() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let items = vec![at("2024-06-03 12:00"), at("2024-06-01 00:00")];

        let kept = trim_to_window(&items, 7, now);

        // Boundary is inclusive: exactly now - 7d stays.
        assert_eq!(kept, vec![at("2024-06-03 12:00")]);
    }

    #[test]
    fn test_trim_empty_input() {
        let now = Utc::now();
        let kept = trim_to_window::<Stamp>(&[], 7, now);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_trim_preserves_order() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let items = vec![
            at("2024-06-09 10:00"),
            at("2024-06-05 10:00"),
            at("2024-06-08 10:00"),
        ];

        let kept = trim_to_window(&items, 7, now);

        assert_eq!(kept, items);
    }
}
