//! SQLite-backed preference store.
//!
//! A small key-value table remembers display state across sessions:
//! granularity, the filter-state snapshot, percentage basis, refresh
//! interval, and theme. Values are stored as JSON with no schema
//! versioning; a corrupt or outdated value fails soft to the caller's
//! default instead of erroring.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

/// Well-known preference keys.
pub mod keys {
    pub const GRANULARITY: &str = "granularity";
    pub const FILTER_STATE: &str = "filter_state";
    pub const PERCENT_BASIS: &str = "percent_basis";
    pub const REFRESH_SECS: &str = "refresh_secs";
    pub const THEME: &str = "theme";
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PrefStore {
    pool: SqlitePool,
}

impl PrefStore {
    /// Create a new store and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:palisade.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prefs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read and deserialize a stored value.
    ///
    /// Returns `None` on a missing key, a read failure, or a value that no
    /// longer deserializes, so callers always fall back to their default.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let row = match sqlx::query("SELECT value FROM prefs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row?,
            Err(e) => {
                warn!(key, error = %e, "Preference read failed");
                return None;
            }
        };

        let raw: String = row.get("value");
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored preference no longer parses, using default");
                None
            }
        }
    }

    /// Serialize and upsert a value.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO prefs (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
