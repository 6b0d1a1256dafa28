//! Cross-filter resolution.
//!
//! One resolver pass derives three parallel views of the alert and
//! decision collections under the active facets:
//!
//! - **active**: narrowed by every facet including the date range, against
//!   non-expired decisions. Feeds ranked lists and summary counts.
//! - **chart**: same alert narrowing, against the including-expired
//!   decision collection, so historical bars show decisions that have
//!   since lapsed.
//! - **slider**: every facet except the date range, so the brush control's
//!   background series does not rescale under the user's drag.
//!
//! Decisions carry no reliable foreign key to alerts; the association is
//! inferred by matching `Decision.value` against the filtered alerts'
//! source IPs (a set intersection, not a list scan). That heuristic is
//! user-visible behavior and is preserved as-is.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};

use crate::filter::FilterState;
use crate::model::{Alert, Decision};
use crate::window::trim_to_window;

/// One filtered pairing of alerts and their matching decisions.
#[derive(Debug, Clone, Default)]
pub struct ViewSlice {
    pub alerts: Vec<Alert>,
    pub decisions: Vec<Decision>,
}

/// The three views produced by one resolver pass, plus the facet-free
/// lookback total used by the percentage-basis toggle.
#[derive(Debug, Clone, Default)]
pub struct ResolvedViews {
    pub active: ViewSlice,
    pub chart: ViewSlice,
    pub slider: ViewSlice,
    pub global_total: usize,
}

/// Run the cross-filter over raw collections.
///
/// `decisions_active` is the non-expired collection, `decisions_all` the
/// including-expired one; both come from the same refresh batch. `now`
/// carries the viewer's timezone, which the date-range facet keys against.
pub fn resolve<Tz: TimeZone>(
    alerts: &[Alert],
    decisions_active: &[Decision],
    decisions_all: &[Decision],
    filter: &FilterState,
    lookback_days: u32,
    now: DateTime<Tz>,
) -> ResolvedViews {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);

    let trimmed_alerts = trim_to_window(alerts, lookback_days, now_utc);
    let trimmed_active = trim_to_window(decisions_active, lookback_days, now_utc);
    let trimmed_all = trim_to_window(decisions_all, lookback_days, now_utc);

    let global_total = trimmed_alerts.len();

    let slider_alerts = apply_facets(&trimmed_alerts, filter, false, &tz);
    let active_alerts = apply_facets(&trimmed_alerts, filter, true, &tz);

    let active_decisions = decisions_matching(&trimmed_active, &active_alerts);
    let chart_decisions = decisions_matching(&trimmed_all, &active_alerts);
    let slider_decisions = decisions_matching(&trimmed_all, &slider_alerts);

    ResolvedViews {
        chart: ViewSlice {
            alerts: active_alerts.clone(),
            decisions: chart_decisions,
        },
        active: ViewSlice {
            alerts: active_alerts,
            decisions: active_decisions,
        },
        slider: ViewSlice {
            alerts: slider_alerts,
            decisions: slider_decisions,
        },
        global_total,
    }
}

/// Apply facet predicates in fixed order: date range, country, scenario,
/// AS, IP, target. An unset facet is a no-op. The target facet selects
/// alerts whose source IP equals the chosen decision target, since that IP
/// equality is the only linkage between the two collections.
fn apply_facets<Tz: TimeZone>(
    alerts: &[Alert],
    filter: &FilterState,
    include_range: bool,
    tz: &Tz,
) -> Vec<Alert> {
    let mut current: Vec<Alert> = alerts.to_vec();

    if include_range {
        if let Some(range) = &filter.date_range {
            current.retain(|a| {
                let local = a.created_at.with_timezone(tz).naive_local();
                range.contains(&range.precision.key(local))
            });
        }
    }
    if let Some(country) = &filter.country {
        current.retain(|a| a.source.cn.as_deref() == Some(country.as_str()));
    }
    if let Some(scenario) = &filter.scenario {
        current.retain(|a| a.scenario == *scenario);
    }
    if let Some(as_name) = &filter.as_name {
        current.retain(|a| a.source.as_name.as_deref() == Some(as_name.as_str()));
    }
    if let Some(ip) = &filter.ip {
        current.retain(|a| a.source.ip == *ip);
    }
    if let Some(target) = &filter.target {
        current.retain(|a| a.source.ip == *target);
    }

    current
}

/// Decisions whose target value appears among the given alerts' source
/// IPs. A decision for an unrelated IP never leaks through.
fn decisions_matching(decisions: &[Decision], alerts: &[Alert]) -> Vec<Decision> {
    let ips: HashSet<&str> = alerts.iter().map(|a| a.source.ip.as_str()).collect();

    decisions
        .iter()
        .filter(|d| ips.contains(d.value.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DateRange, Facet};
    use crate::model::{AlertSource, DecisionDetail};
    use chrono::{FixedOffset, NaiveDateTime};

    fn alert(id: u64, created: &str, ip: &str, cn: Option<&str>, scenario: &str) -> Alert {
        let naive = NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M").unwrap();
        Alert {
            id,
            created_at: naive.and_utc(),
            scenario: scenario.to_string(),
            source: AlertSource {
                ip: ip.to_string(),
                cn: cn.map(str::to_string),
                as_name: Some(format!("AS{id}")),
            },
        }
    }

    fn decision(id: u64, created: &str, value: &str, expired: bool) -> Decision {
        let naive = NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M").unwrap();
        Decision {
            id,
            created_at: naive.and_utc(),
            value: value.to_string(),
            expired,
            detail: DecisionDetail {
                reason: None,
                country: None,
                as_name: None,
                action: "ban".to_string(),
                duration: "4h".to_string(),
                alert_id: None,
            },
        }
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .unwrap()
    }

    fn sample_alerts() -> Vec<Alert> {
        vec![
            alert(1, "2024-06-08T10:00", "1.1.1.1", Some("US"), "acme/ssh-bf"),
            alert(2, "2024-06-09T23:50", "2.2.2.2", Some("DE"), "acme/http-probing"),
        ]
    }

    #[test]
    fn test_country_facet_narrows_alerts_and_joins_decisions() {
        let alerts = sample_alerts();
        let decisions = vec![
            decision(10, "2024-06-08T11:00", "1.1.1.1", false),
            decision(11, "2024-06-09T23:55", "2.2.2.2", false),
        ];
        let mut filter = FilterState::default();
        filter.toggle(Facet::Country, "US");

        let views = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        assert_eq!(views.active.alerts.len(), 1);
        assert_eq!(views.active.alerts[0].id, 1);
        // The 1.1.1.1 decision follows the alert in; 2.2.2.2 must not.
        assert_eq!(views.active.decisions.len(), 1);
        assert_eq!(views.active.decisions[0].value, "1.1.1.1");
    }

    #[test]
    fn test_adding_facets_never_grows_active_view() {
        let alerts = sample_alerts();
        let decisions = vec![decision(10, "2024-06-08T11:00", "1.1.1.1", false)];

        let mut filter = FilterState::default();
        let unfiltered = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        filter.toggle(Facet::Country, "US");
        let one_facet = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        filter.toggle(Facet::Scenario, "acme/ssh-bf");
        let two_facets = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        filter.toggle(Facet::Ip, "9.9.9.9");
        let three_facets = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        assert!(one_facet.active.alerts.len() <= unfiltered.active.alerts.len());
        assert!(two_facets.active.alerts.len() <= one_facet.active.alerts.len());
        assert!(three_facets.active.alerts.len() <= two_facets.active.alerts.len());
        assert_eq!(three_facets.active.alerts.len(), 0);
        assert!(three_facets.active.decisions.is_empty());
    }

    #[test]
    fn test_decision_join_is_subset_of_filtered_ips() {
        let alerts = sample_alerts();
        let decisions = vec![
            decision(10, "2024-06-08T11:00", "1.1.1.1", false),
            decision(11, "2024-06-08T12:00", "8.8.8.8", false),
        ];
        let filter = FilterState::default();

        let views = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        let ips: HashSet<&str> = views
            .active
            .alerts
            .iter()
            .map(|a| a.source.ip.as_str())
            .collect();
        assert!(
            views
                .active
                .decisions
                .iter()
                .all(|d| ips.contains(d.value.as_str()))
        );
        // 8.8.8.8 has no alert and never appears.
        assert!(views.active.decisions.iter().all(|d| d.value != "8.8.8.8"));
    }

    #[test]
    fn test_chart_view_includes_expired_decisions() {
        let alerts = sample_alerts();
        let active_only = vec![decision(10, "2024-06-08T11:00", "1.1.1.1", false)];
        let including_expired = vec![
            decision(10, "2024-06-08T11:00", "1.1.1.1", false),
            decision(12, "2024-06-05T09:00", "1.1.1.1", true),
        ];
        let filter = FilterState::default();

        let views = resolve(&alerts, &active_only, &including_expired, &filter, 7, now());

        assert_eq!(views.active.decisions.len(), 1);
        assert_eq!(views.chart.decisions.len(), 2);
    }

    #[test]
    fn test_slider_view_ignores_date_range() {
        let alerts = sample_alerts();
        let decisions: Vec<Decision> = Vec::new();
        let mut filter = FilterState::default();
        filter.set_range(
            DateRange {
                start: "2024-06-08".to_string(),
                end: "2024-06-08".to_string(),
                precision: crate::buckets::Granularity::Day,
            },
            false,
        );

        let views = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        assert_eq!(views.active.alerts.len(), 1);
        assert_eq!(views.slider.alerts.len(), 2);
    }

    #[test]
    fn test_global_total_ignores_facets() {
        let alerts = sample_alerts();
        let decisions: Vec<Decision> = Vec::new();
        let mut filter = FilterState::default();
        filter.toggle(Facet::Country, "US");

        let views = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        assert_eq!(views.global_total, 2);
        assert_eq!(views.active.alerts.len(), 1);
    }

    #[test]
    fn test_target_facet_narrows_by_source_ip() {
        let alerts = sample_alerts();
        let decisions = vec![
            decision(10, "2024-06-08T11:00", "1.1.1.1", false),
            decision(11, "2024-06-09T23:55", "2.2.2.2", false),
        ];
        let mut filter = FilterState::default();
        filter.toggle(Facet::Target, "2.2.2.2");

        let views = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        assert_eq!(views.active.alerts.len(), 1);
        assert_eq!(views.active.alerts[0].source.ip, "2.2.2.2");
        assert_eq!(views.active.decisions.len(), 1);
        assert_eq!(views.active.decisions[0].value, "2.2.2.2");
    }

    #[test]
    fn test_lookback_trims_before_filtering() {
        let mut alerts = sample_alerts();
        alerts.push(alert(3, "2024-05-01T00:00", "3.3.3.3", Some("FR"), "acme/old"));
        let decisions: Vec<Decision> = Vec::new();
        let filter = FilterState::default();

        let views = resolve(&alerts, &decisions, &decisions, &filter, 7, now());

        assert_eq!(views.global_total, 2);
        assert!(views.active.alerts.iter().all(|a| a.id != 3));
    }

    #[test]
    fn test_empty_collections_resolve_to_empty_views() {
        let filter = FilterState::default();

        let views = resolve(&[], &[], &[], &filter, 7, now());

        assert!(views.active.alerts.is_empty());
        assert!(views.chart.decisions.is_empty());
        assert!(views.slider.alerts.is_empty());
        assert_eq!(views.global_total, 0);
    }
}
