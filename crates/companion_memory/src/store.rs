//! SQLite-backed structured storage for memory records, plus their vectors.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use companion_core::model::{Emotion, MemoryKind, MemoryRecord, PropertyMap};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use uuid::Uuid;

#[derive(Clone)]
pub struct MemoryStore {
    pool: Pool<Sqlite>,
}

impl MemoryStore {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .context("failed to connect to memory store")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory memory store")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                tenant TEXT NOT NULL,
                player TEXT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                emotion TEXT,
                importance REAL NOT NULL,
                initial_importance REAL NOT NULL,
                context_json TEXT NOT NULL,
                embedding BLOB,
                embedding_pending INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create memories table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_player ON memories(tenant, player)")
            .execute(&self.pool)
            .await
            .context("failed to create memories player index")?;

        Ok(())
    }

    pub async fn insert(&self, record: &MemoryRecord) -> Result<()> {
        let embedding_blob = match &record.embedding {
            Some(v) => Some(bincode::serialize(v).context("failed to serialize embedding")?),
            None => None,
        };
        sqlx::query(
            r#"
            INSERT INTO memories
                (id, tenant, player, kind, content, emotion, importance, initial_importance,
                 context_json, embedding, embedding_pending, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.tenant)
        .bind(&record.player)
        .bind(serde_json::to_string(&record.kind)?)
        .bind(&record.content)
        .bind(record.emotion.map(|e| e.as_str()))
        .bind(record.importance)
        .bind(serde_json::to_string(&record.context)?)
        .bind(embedding_blob)
        .bind(record.embedding_pending as i64)
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await
        .context("failed to insert memory record")?;
        Ok(())
    }

    pub async fn fetch_recent(
        &self,
        tenant: &str,
        player: &str,
        min_importance: f32,
        limit: i64,
    ) -> Result<Vec<MemoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant, player, kind, content, emotion, importance, context_json,
                   embedding, embedding_pending, created_at
            FROM memories
            WHERE tenant = ?1 AND player = ?2 AND importance >= ?3
            ORDER BY created_at DESC
            LIMIT ?4
            "#,
        )
        .bind(tenant)
        .bind(player)
        .bind(min_importance)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch recent memories")?;

        rows.iter().map(row_to_record).collect()
    }

    /// Every record for a player that has a stored embedding, for brute-force
    /// semantic search (fine at the scale a single player accumulates).
    pub async fn fetch_with_embeddings(
        &self,
        tenant: &str,
        player: &str,
        min_importance: f32,
    ) -> Result<Vec<MemoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant, player, kind, content, emotion, importance, context_json,
                   embedding, embedding_pending, created_at
            FROM memories
            WHERE tenant = ?1 AND player = ?2 AND importance >= ?3 AND embedding IS NOT NULL
            "#,
        )
        .bind(tenant)
        .bind(player)
        .bind(min_importance)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch embedded memories")?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn fetch_pending_embeddings(&self, limit: i64) -> Result<Vec<MemoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant, player, kind, content, emotion, importance, context_json,
                   embedding, embedding_pending, created_at
            FROM memories
            WHERE embedding_pending = 1
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch pending-embedding memories")?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn set_embedding(&self, id: Uuid, embedding: &[f32]) -> Result<()> {
        let blob = bincode::serialize(embedding).context("failed to serialize embedding")?;
        sqlx::query(
            "UPDATE memories SET embedding = ?1, embedding_pending = 0 WHERE id = ?2",
        )
        .bind(blob)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("failed to store embedding")?;
        Ok(())
    }

    /// Apply the decay formula to every record older than its creation day.
    /// Returns the number of rows updated.
    pub async fn decay_all(&self, now: DateTime<Utc>) -> Result<u64> {
        let rows = sqlx::query(
            "SELECT id, importance, initial_importance, created_at FROM memories",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch memories for decay")?;

        let mut updated = 0u64;
        for row in rows {
            let id: String = row.get("id");
            let importance: f64 = row.get("importance");
            let initial_importance: f64 = row.get("initial_importance");
            let created_at: i64 = row.get("created_at");
            let days = (now.timestamp() - created_at) as f64 / 86_400.0;
            if days < 1.0 {
                continue;
            }
            let decayed = crate::importance::decay(
                initial_importance as f32,
                importance as f32,
                days,
            );
            if (decayed as f64 - importance).abs() > f64::EPSILON {
                sqlx::query("UPDATE memories SET importance = ?1 WHERE id = ?2")
                    .bind(decayed)
                    .bind(&id)
                    .execute(&self.pool)
                    .await
                    .context("failed to write decayed importance")?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    pub async fn cleanup(
        &self,
        tenant: &str,
        player: &str,
        min_importance: f32,
        max_age_days: Option<f64>,
    ) -> Result<u64> {
        let result = match max_age_days {
            Some(days) => {
                let cutoff = Utc::now().timestamp() - (days * 86_400.0) as i64;
                sqlx::query(
                    "DELETE FROM memories WHERE tenant = ?1 AND player = ?2 AND (importance < ?3 OR created_at < ?4)",
                )
                .bind(tenant)
                .bind(player)
                .bind(min_importance)
                .bind(cutoff)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "DELETE FROM memories WHERE tenant = ?1 AND player = ?2 AND importance < ?3",
                )
                .bind(tenant)
                .bind(player)
                .bind(min_importance)
                .execute(&self.pool)
                .await
            }
        }
        .context("failed to clean up memories")?;

        Ok(result.rows_affected())
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryRecord> {
    let id: String = row.get("id");
    let kind_json: String = row.get("kind");
    let emotion_str: Option<String> = row.get("emotion");
    let context_json: String = row.get("context_json");
    let embedding_blob: Option<Vec<u8>> = row.get("embedding");
    let created_at: i64 = row.get("created_at");

    let embedding = embedding_blob
        .map(|b| bincode::deserialize::<Vec<f32>>(&b))
        .transpose()
        .context("failed to deserialize embedding")?;

    Ok(MemoryRecord {
        id: Uuid::parse_str(&id).context("corrupt memory id")?,
        tenant: row.get("tenant"),
        player: row.get("player"),
        kind: serde_json::from_str::<MemoryKind>(&kind_json).context("corrupt memory kind")?,
        content: row.get("content"),
        emotion: emotion_str.and_then(|s| Emotion::parse(&s)),
        importance: row.get::<f64, _>("importance") as f32,
        context: serde_json::from_str::<PropertyMap>(&context_json)
            .context("corrupt memory context")?,
        embedding,
        embedding_pending: row.get::<i64, _>("embedding_pending") != 0,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
    })
}
