//! Top-K rankings over a grouping key.
//!
//! Counts occurrences per distinct extracted value and returns the top K
//! by count, descending. Ties keep first-seen order: accumulation runs
//! over an insertion-ordered vector with a key index, and the final sort
//! is stable, so iteration order never depends on hash state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Alert, Decision};

/// Basis for ranked-item percentages: the facet-filtered total or the
/// facet-free lookback total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentBasis {
    Filtered,
    Global,
}

impl Default for PercentBasis {
    fn default() -> Self {
        PercentBasis::Filtered
    }
}

/// One row of a ranked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub label: String,
    pub count: u64,

    /// Share of the chosen basis total, when one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

/// Rank items by an extracted grouping key.
///
/// `None`, empty and literal `"Unknown"` extractions are excluded: not
/// counted, not shown. Output length is at most `k`.
pub fn rank_top_k<T, F>(items: &[T], extract: F, k: usize) -> Vec<RankedItem>
where
    F: Fn(&T) -> Option<String>,
{
    let mut ranked: Vec<RankedItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let Some(label) = extract(item) else { continue };
        if label.is_empty() || label == "Unknown" {
            continue;
        }

        match index.get(&label) {
            Some(&i) => ranked[i].count += 1,
            None => {
                index.insert(label.clone(), ranked.len());
                ranked.push(RankedItem {
                    label,
                    count: 1,
                    percentage: None,
                });
            }
        }
    }

    // Stable sort: equal counts keep first-seen order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(k);
    ranked
}

/// Fill in percentages against `basis_total`. A zero total leaves
/// percentages unset rather than dividing by zero.
pub fn with_percentages(mut ranked: Vec<RankedItem>, basis_total: usize) -> Vec<RankedItem> {
    if basis_total == 0 {
        return ranked;
    }
    for item in &mut ranked {
        item.percentage = Some(item.count as f64 / basis_total as f64 * 100.0);
    }
    ranked
}

// Field extractors. Country ranking keys on the 2-letter code, not a
// display name, so differently-localized names for the same country can
// never split or collide.

pub fn alert_ip(alert: &Alert) -> Option<String> {
    Some(alert.source.ip.clone())
}

pub fn alert_country(alert: &Alert) -> Option<String> {
    alert.source.cn.clone()
}

pub fn alert_scenario(alert: &Alert) -> Option<String> {
    Some(alert.scenario.clone())
}

pub fn alert_as_name(alert: &Alert) -> Option<String> {
    alert.source.as_name.clone()
}

pub fn decision_target(decision: &Decision) -> Option<String> {
    Some(decision.value.clone())
}
