//! Palisade - a cross-filtering dashboard for security alerts and
//! enforcement decisions.
//!
//! # Overview
//!
//! Palisade pulls raw alert and decision collections from a remote
//! security API and lets an operator explore them through linked,
//! mutually-narrowing filters (country, scenario, autonomous system, IP,
//! target, date range) and synchronized views: a time-series chart, a
//! brush slider and ranked Top-K lists.
//!
//! The heart of the crate is a pure engine: trimming to a lookback
//! window, zero-filled local-time bucketing, Top-K ranking, and a
//! cross-filter resolver that derives three parallel views (active,
//! chart, slider) from one pass. Everything stateful - the HTTP surface,
//! the refresh cycles, the preference store - sits around that engine and
//! stays thin.
//!
//! # Modules
//!
//! - [`model`]: Wire types for alerts, decisions and the remote config
//! - [`window`]: Lookback-window trimming
//! - [`buckets`]: Day/hour bucket series
//! - [`rank`]: Top-K rankings
//! - [`filter`]: Facet state and date ranges
//! - [`resolver`]: Cross-filter resolution
//! - [`range`]: Brush-gesture resolution
//! - [`debounce`]: Trailing-debounce primitive
//! - [`refresh`]: Batch fetch cycles and the polling task
//! - [`api_client`]: Remote API client
//! - [`store`]: SQLite preference store
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod api_client;
pub mod buckets;
pub mod debounce;
pub mod filter;
pub mod model;
pub mod range;
pub mod rank;
pub mod refresh;
pub mod resolver;
pub mod store;
pub mod window;
