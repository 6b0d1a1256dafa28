//! HTTP API handlers for Palisade.
//!
//! The engine itself is pure; these handlers own the shared state and
//! serialize all mutations behind it. A browser front-end drives the
//! dashboard through this surface:
//!
//! - **GET /dashboard**: one resolver pass, returning bucket series,
//!   ranked lists and summary counts for the active filter.
//! - **POST /filters/toggle**, **POST /filters/reset**: facet mutations.
//! - **POST /range**: brush gestures, committed through the debouncer.
//! - **POST /granularity**: day/hour switch (clears any date range).
//! - **POST /refresh**: foreground refresh cycle.
//! - **GET/POST /prefs**: display preferences, persisted across sessions.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{info, instrument, warn};

use crate::api_client::ApiClient;
use crate::buckets::{Bucket, Granularity, bucket_series};
use crate::debounce::Debouncer;
use crate::filter::{DateRange, Facet, FilterState};
use crate::model::RemoteConfig;
use crate::range::{BrushOutcome, resolve_brush};
use crate::rank::{self, PercentBasis, RankedItem, rank_top_k, with_percentages};
use crate::refresh::{DashStatus, RefreshKind, Snapshot, run_cycle};
use crate::resolver;
use crate::store::{PrefStore, keys};

/// Rows shown per ranked list.
const TOP_K: usize = 10;

/// Background refresh interval used before any preference is stored.
pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// Mutable dashboard state: the last good snapshot plus everything the
/// operator has selected.
#[derive(Debug)]
pub struct DashState {
    pub snapshot: Option<Snapshot>,
    pub filter: FilterState,
    pub granularity: Granularity,
    pub percent_basis: PercentBasis,
    pub status: DashStatus,
    pub refresh_secs: u64,
    pub theme: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: ApiClient,
    pub prefs: PrefStore,
    pub dash: Arc<RwLock<DashState>>,
    pub brush: Arc<Mutex<Debouncer>>,
    pub refresh_interval: Arc<watch::Sender<Option<Duration>>>,
}

impl AppState {
    /// Build the state, restoring persisted preferences. Every stored
    /// value fails soft to its default.
    pub async fn new(client: ApiClient, prefs: PrefStore) -> Self {
        let granularity = prefs
            .get(keys::GRANULARITY)
            .await
            .unwrap_or(Granularity::Day);
        let filter: FilterState = prefs.get(keys::FILTER_STATE).await.unwrap_or_default();
        let percent_basis = prefs.get(keys::PERCENT_BASIS).await.unwrap_or_default();
        let refresh_secs: u64 = prefs
            .get(keys::REFRESH_SECS)
            .await
            .unwrap_or(DEFAULT_REFRESH_SECS);
        let theme: String = prefs
            .get(keys::THEME)
            .await
            .unwrap_or_else(|| "dark".to_string());

        let (interval_tx, _) = watch::channel(interval_from_secs(refresh_secs));

        Self {
            client,
            prefs,
            dash: Arc::new(RwLock::new(DashState {
                snapshot: None,
                filter,
                granularity,
                percent_basis,
                status: DashStatus::Loading,
                refresh_secs,
                theme,
            })),
            brush: Arc::new(Mutex::new(Debouncer::default())),
            refresh_interval: Arc::new(interval_tx),
        }
    }

    /// Receiver for the polling task.
    pub fn subscribe_interval(&self) -> watch::Receiver<Option<Duration>> {
        self.refresh_interval.subscribe()
    }
}

/// Zero means polling off.
fn interval_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/filters/toggle", post(post_filter_toggle))
        .route("/filters/reset", post(post_filter_reset))
        .route("/range", post(post_range))
        .route("/granularity", post(post_granularity))
        .route("/refresh", post(post_refresh))
        .route("/prefs", get(get_prefs).post(post_prefs))
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Summary counts for the active view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub alert_count: usize,
    pub decision_count: usize,
    pub global_alert_count: usize,
}

/// Everything the front-end needs to render one dashboard frame.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub generated_at: DateTime<Utc>,
    pub status: DashStatus,
    pub lookback_days: u32,
    pub granularity: Granularity,
    pub filter: FilterState,
    pub summary: DashboardSummary,

    /// Alert series under every facet including the date range.
    pub chart: Vec<Bucket>,

    /// Decision series (including expired) under the same narrowing.
    pub decision_chart: Vec<Bucket>,

    /// Alert series under every facet except the date range; backs the
    /// brush control.
    pub slider: Vec<Bucket>,

    pub top_ips: Vec<RankedItem>,
    pub top_countries: Vec<RankedItem>,
    pub top_scenarios: Vec<RankedItem>,
    pub top_as: Vec<RankedItem>,
    pub top_targets: Vec<RankedItem>,
}

/// Assemble one dashboard frame from the current state. Pure given the
/// state and a reference instant; the handler passes `Local::now()`.
pub fn build_dashboard<Tz: TimeZone>(dash: &DashState, now: DateTime<Tz>) -> DashboardResponse {
    let generated_at = now.with_timezone(&Utc);

    let Some(snapshot) = &dash.snapshot else {
        // No data yet (or the very first cycle failed): explicit empty
        // frame rather than an error.
        return DashboardResponse {
            generated_at,
            status: dash.status,
            lookback_days: RemoteConfig::default().lookback_days,
            granularity: dash.granularity,
            filter: dash.filter.clone(),
            summary: DashboardSummary {
                alert_count: 0,
                decision_count: 0,
                global_alert_count: 0,
            },
            chart: Vec::new(),
            decision_chart: Vec::new(),
            slider: Vec::new(),
            top_ips: Vec::new(),
            top_countries: Vec::new(),
            top_scenarios: Vec::new(),
            top_as: Vec::new(),
            top_targets: Vec::new(),
        };
    };

    let views = resolver::resolve(
        &snapshot.alerts,
        &snapshot.decisions_active,
        &snapshot.decisions_all,
        &dash.filter,
        snapshot.lookback_days,
        now.clone(),
    );

    let units = dash.granularity.window_units(snapshot.lookback_days);
    let range = dash.filter.date_range.as_ref();
    let chart = bucket_series(&views.chart.alerts, units, dash.granularity, range, now.clone());
    let decision_chart = bucket_series(
        &views.chart.decisions,
        units,
        dash.granularity,
        range,
        now.clone(),
    );
    let slider = bucket_series(&views.slider.alerts, units, dash.granularity, None, now);

    let alert_basis = match dash.percent_basis {
        PercentBasis::Filtered => views.active.alerts.len(),
        PercentBasis::Global => views.global_total,
    };
    let active = &views.active;

    DashboardResponse {
        generated_at,
        status: dash.status,
        lookback_days: snapshot.lookback_days,
        granularity: dash.granularity,
        filter: dash.filter.clone(),
        summary: DashboardSummary {
            alert_count: active.alerts.len(),
            decision_count: active.decisions.len(),
            global_alert_count: views.global_total,
        },
        chart,
        decision_chart,
        slider,
        top_ips: with_percentages(rank_top_k(&active.alerts, rank::alert_ip, TOP_K), alert_basis),
        top_countries: with_percentages(
            rank_top_k(&active.alerts, rank::alert_country, TOP_K),
            alert_basis,
        ),
        top_scenarios: with_percentages(
            rank_top_k(&active.alerts, rank::alert_scenario, TOP_K),
            alert_basis,
        ),
        top_as: with_percentages(
            rank_top_k(&active.alerts, rank::alert_as_name, TOP_K),
            alert_basis,
        ),
        // Target percentages are shares of the matching decisions; the
        // basis toggle only applies to alert-derived lists.
        top_targets: with_percentages(
            rank_top_k(&active.decisions, rank::decision_target, TOP_K),
            active.decisions.len(),
        ),
    }
}

/// GET /dashboard - Resolve the cross-filter and return one frame.
#[instrument(skip(state))]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    let dash = state.dash.read().await;
    let response = build_dashboard(&dash, Local::now());

    info!(
        alert_count = response.summary.alert_count,
        decision_count = response.summary.decision_count,
        status = ?response.status,
        "Dashboard resolved"
    );
    Json(response)
}

/// Request body for POST /filters/toggle.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub facet: Facet,
    pub value: String,
}

/// POST /filters/toggle - Select a facet value, or clear it when it is
/// already selected.
#[instrument(skip(state))]
pub async fn post_filter_toggle(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Json<FilterState> {
    let filter = {
        let mut dash = state.dash.write().await;
        dash.filter.toggle(request.facet, &request.value);
        dash.filter.clone()
    };

    persist_filter(&state, &filter).await;
    info!(facet = ?request.facet, "Filter toggled");
    Json(filter)
}

/// POST /filters/reset - Clear every facet.
#[instrument(skip(state))]
pub async fn post_filter_reset(State(state): State<AppState>) -> Json<FilterState> {
    let filter = {
        let mut dash = state.dash.write().await;
        dash.filter.reset();
        dash.filter.clone()
    };

    persist_filter(&state, &filter).await;
    info!("Filters reset");
    Json(filter)
}

/// Request body for POST /range: an index pair into the slider's bucket
/// sequence, as reported by the brush widget.
#[derive(Debug, Deserialize)]
pub struct RangeRequest {
    pub start_index: usize,
    pub end_index: usize,
}

/// Echo of the resolved brush outcome. The filter mutation itself commits
/// after the debounce window.
#[derive(Debug, Clone, Serialize)]
pub struct RangeResponse {
    pub cleared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub sticky: bool,
}

/// POST /range - Resolve a brush gesture against the current slider
/// sequence and commit it through the debouncer (last gesture in a quiet
/// window wins).
#[instrument(skip(state))]
pub async fn post_range(
    State(state): State<AppState>,
    Json(request): Json<RangeRequest>,
) -> Json<RangeResponse> {
    let outcome = {
        let dash = state.dash.read().await;
        match &dash.snapshot {
            Some(snapshot) => {
                let now = Local::now();
                let views = resolver::resolve(
                    &snapshot.alerts,
                    &snapshot.decisions_active,
                    &snapshot.decisions_all,
                    &dash.filter,
                    snapshot.lookback_days,
                    now,
                );
                let units = dash.granularity.window_units(snapshot.lookback_days);
                let slider =
                    bucket_series(&views.slider.alerts, units, dash.granularity, None, now);
                resolve_brush(request.start_index, request.end_index, &slider, dash.granularity)
            }
            None => BrushOutcome::Clear,
        }
    };

    let response = match &outcome {
        BrushOutcome::Clear => RangeResponse {
            cleared: true,
            range: None,
            sticky: false,
        },
        BrushOutcome::Select { range, sticky } => RangeResponse {
            cleared: false,
            range: Some(range.clone()),
            sticky: *sticky,
        },
    };

    let commit_state = state.clone();
    state.brush.lock().await.call(async move {
        apply_brush(&commit_state, outcome).await;
    });

    Json(response)
}

async fn apply_brush(state: &AppState, outcome: BrushOutcome) {
    let filter = {
        let mut dash = state.dash.write().await;
        match outcome {
            BrushOutcome::Clear => dash.filter.clear_range(),
            BrushOutcome::Select { range, sticky } => dash.filter.set_range(range, sticky),
        }
        dash.filter.clone()
    };

    persist_filter(state, &filter).await;
    info!(has_range = filter.date_range.is_some(), "Brush committed");
}

/// Request body for POST /granularity.
#[derive(Debug, Deserialize)]
pub struct GranularityRequest {
    pub granularity: Granularity,
}

/// POST /granularity - Switch bucket width. Always clears an active date
/// range, since keys are not comparable across precisions.
#[instrument(skip(state))]
pub async fn post_granularity(
    State(state): State<AppState>,
    Json(request): Json<GranularityRequest>,
) -> Json<FilterState> {
    let filter = {
        let mut dash = state.dash.write().await;
        if dash.granularity != request.granularity {
            dash.granularity = request.granularity;
            dash.filter.clear_range();
        }
        dash.filter.clone()
    };

    if let Err(e) = state
        .prefs
        .set(keys::GRANULARITY, &request.granularity)
        .await
    {
        warn!(error = %e, "Failed to persist granularity");
    }
    persist_filter(&state, &filter).await;
    info!(granularity = ?request.granularity, "Granularity switched");
    Json(filter)
}

/// Status reply for POST /refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub status: DashStatus,
}

/// POST /refresh - Run a foreground refresh cycle.
#[instrument(skip(state))]
pub async fn post_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let status = run_cycle(&state, RefreshKind::Foreground).await;
    Json(RefreshResponse { status })
}

/// Display preferences, echoed by GET /prefs and patched by POST /prefs.
#[derive(Debug, Clone, Serialize)]
pub struct PrefsResponse {
    pub granularity: Granularity,
    pub percent_basis: PercentBasis,
    /// Background refresh interval in seconds; 0 means off.
    pub refresh_secs: u64,
    pub theme: String,
}

/// GET /prefs - Current display preferences.
#[instrument(skip(state))]
pub async fn get_prefs(State(state): State<AppState>) -> Json<PrefsResponse> {
    let dash = state.dash.read().await;
    Json(PrefsResponse {
        granularity: dash.granularity,
        percent_basis: dash.percent_basis,
        refresh_secs: dash.refresh_secs,
        theme: dash.theme.clone(),
    })
}

/// Request body for POST /prefs. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct PrefsUpdate {
    pub granularity: Option<Granularity>,
    pub percent_basis: Option<PercentBasis>,
    pub refresh_secs: Option<u64>,
    pub theme: Option<String>,
}

/// POST /prefs - Update display preferences. An interval change takes
/// effect on the polling task's next tick.
#[instrument(skip(state))]
pub async fn post_prefs(
    State(state): State<AppState>,
    Json(update): Json<PrefsUpdate>,
) -> Json<PrefsResponse> {
    let (response, filter_to_persist) = {
        let mut dash = state.dash.write().await;

        let mut filter_to_persist = None;
        if let Some(granularity) = update.granularity {
            if dash.granularity != granularity {
                dash.granularity = granularity;
                dash.filter.clear_range();
                filter_to_persist = Some(dash.filter.clone());
            }
        }
        if let Some(basis) = update.percent_basis {
            dash.percent_basis = basis;
        }
        if let Some(secs) = update.refresh_secs {
            dash.refresh_secs = secs;
            state.refresh_interval.send_replace(interval_from_secs(secs));
        }
        if let Some(theme) = &update.theme {
            dash.theme = theme.clone();
        }

        (
            PrefsResponse {
                granularity: dash.granularity,
                percent_basis: dash.percent_basis,
                refresh_secs: dash.refresh_secs,
                theme: dash.theme.clone(),
            },
            filter_to_persist,
        )
    };

    persist_pref(&state, keys::GRANULARITY, &response.granularity).await;
    persist_pref(&state, keys::PERCENT_BASIS, &response.percent_basis).await;
    persist_pref(&state, keys::REFRESH_SECS, &response.refresh_secs).await;
    persist_pref(&state, keys::THEME, &response.theme).await;
    if let Some(filter) = filter_to_persist {
        persist_filter(&state, &filter).await;
    }

    info!("Preferences updated");
    Json(response)
}

async fn persist_filter(state: &AppState, filter: &FilterState) {
    if let Err(e) = state.prefs.set(keys::FILTER_STATE, filter).await {
        warn!(error = %e, "Failed to persist filter state");
    }
}

async fn persist_pref<T: Serialize + std::fmt::Debug>(state: &AppState, key: &str, value: &T) {
    if let Err(e) = state.prefs.set(key, value).await {
        warn!(key, error = %e, "Failed to persist preference");
    }
}
