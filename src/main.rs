//! Palisade - a cross-filtering dashboard for security alerts and
//! enforcement decisions.
//!
//! # API Endpoints
//!
//! - `GET /dashboard` - Resolve the cross-filter and return one frame
//! - `POST /filters/toggle` - Toggle a facet value
//! - `POST /filters/reset` - Clear every facet
//! - `POST /range` - Commit a brush gesture (debounced)
//! - `POST /granularity` - Switch day/hour buckets
//! - `POST /refresh` - Run a foreground refresh cycle
//! - `GET|POST /prefs` - Display preferences
//! - `GET /health` - Health check

use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use palisade::api::{AppState, router};
use palisade::api_client::{ApiClient, DEFAULT_API_BASE};
use palisade::refresh::{Poller, RefreshKind, run_cycle};
use palisade::store::PrefStore;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:palisade.db?mode=rwc";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("palisade=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("PALISADE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url = env::var("PALISADE_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let api_url = env::var("PALISADE_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let api_key = env::var("PALISADE_API_KEY").ok();

    info!(port, db_url = %db_url, api_url = %api_url, "Starting Palisade server");

    // Initialize preference store and restore persisted display state
    let prefs = PrefStore::new(&db_url).await?;
    let client = ApiClient::new(&api_url, api_key);
    let state = AppState::new(client, prefs).await;
    info!("Preference store initialized");

    // First cycle in the foreground; a failure leaves the dashboard in
    // its degraded empty state rather than aborting startup.
    let status = run_cycle(&state, RefreshKind::Foreground).await;
    info!(status = ?status, "Initial refresh cycle finished");
    if status != palisade::refresh::DashStatus::Ok {
        warn!("Remote API unreachable at startup; serving empty dashboard");
    }

    // Background polling, driven by the persisted interval preference
    let _poller = Poller::spawn(state.clone(), state.subscribe_interval());

    // Build router
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Palisade is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
