//! Shared persistent tier backing the Budget Governor's daily buckets, the
//! Response Cache's KV tier, and the Cost & Metric Sink's batched writes.
//!
//! A single SQLite database covers all three so a single-node deployment
//! needs no extra infrastructure. Writers are serialized by SQLite itself;
//! readers are concurrent.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

#[derive(Clone)]
pub struct SharedStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl SharedStore {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                    sqlx::query("PRAGMA journal_mode = WAL").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .context("failed to connect to shared store")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory store")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS budget_buckets (
                tenant TEXT NOT NULL,
                day TEXT NOT NULL,
                spent_usd REAL NOT NULL DEFAULT 0,
                denied_count INTEGER NOT NULL DEFAULT 0,
                generative_count INTEGER NOT NULL DEFAULT 0,
                classifier_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (tenant, day)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create budget_buckets table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                fingerprint TEXT PRIMARY KEY,
                response_json TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create response_cache table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cost_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant TEXT NOT NULL,
                game TEXT NOT NULL,
                player TEXT NOT NULL,
                component TEXT NOT NULL,
                operation TEXT NOT NULL,
                latency_ms INTEGER NOT NULL,
                status_code INTEGER NOT NULL,
                cost_usd REAL NOT NULL,
                cache_hit INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create cost_metrics table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cost_metrics_tenant ON cost_metrics(tenant)")
            .execute(&self.pool)
            .await
            .context("failed to create cost_metrics tenant index")?;

        Ok(())
    }
}
