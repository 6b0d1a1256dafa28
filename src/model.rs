//! Data models for Palisade.
//!
//! These types mirror the wire shapes served by the remote security API.
//! Alerts and decisions are immutable once fetched; the engine only reads
//! them. Optional fields that the API frequently omits (`cn`, `as_name`,
//! `alert_id`) deserialize to `None` and are excluded from ranking rather
//! than treated as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything carrying a creation timestamp, so the lookback window and the
/// bucket aggregator can operate on alerts and decisions uniformly.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// A security alert raised by a detection scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier assigned by the remote API.
    pub id: u64,

    /// When the alert was created (UTC on the wire; bucket keys are
    /// derived in the viewer's local time).
    pub created_at: DateTime<Utc>,

    /// Scenario that fired, namespaced as `author/name`
    /// (e.g. "crowdsecurity/ssh-bf").
    pub scenario: String,

    /// Descriptor of the offending source.
    pub source: AlertSource,
}

impl Timestamped for Alert {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Source descriptor attached to an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSource {
    /// Source IP address. Also the join key to decisions (see
    /// [`crate::resolver`]).
    pub ip: String,

    /// ISO 3166-1 alpha-2 country code, when geolocation resolved.
    #[serde(default)]
    pub cn: Option<String>,

    /// Autonomous system name, when known.
    #[serde(default)]
    pub as_name: Option<String>,
}

/// An enforcement decision (ban, captcha, ...) taken against a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision identifier assigned by the remote API.
    pub id: u64,

    /// When the decision was created.
    pub created_at: DateTime<Utc>,

    /// The decision target: an IP address string. Matching this against
    /// `Alert.source.ip` is how decisions are associated with alerts.
    pub value: String,

    /// Whether the decision has expired. The active view only shows
    /// non-expired decisions; the chart view includes expired ones so
    /// historical bars stay accurate.
    #[serde(default)]
    pub expired: bool,

    /// Detail descriptor.
    pub detail: DecisionDetail,
}

impl Timestamped for Decision {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Detail block carried by a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionDetail {
    /// The scenario or manual reason behind the decision.
    #[serde(default)]
    pub reason: Option<String>,

    /// Country code of the target, when known.
    #[serde(default)]
    pub country: Option<String>,

    /// Autonomous system name of the target, when known.
    #[serde(default, rename = "as")]
    pub as_name: Option<String>,

    /// Remediation action (e.g. "ban", "captcha").
    pub action: String,

    /// Remediation duration as reported by the API (e.g. "4h").
    pub duration: String,

    /// Optional link back to the originating alert. Frequently absent;
    /// the IP join is used regardless (see DESIGN.md).
    #[serde(default)]
    pub alert_id: Option<u64>,
}

/// Configuration object served by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Trailing window, in days, within which dashboard data is "current".
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_lookback_days() -> u32 {
    7
}
