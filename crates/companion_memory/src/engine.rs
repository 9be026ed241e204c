//! Memory Engine: append, hybrid context retrieval, semantic search, cleanup.

use crate::embedding::{cosine_similarity, Embedder};
use crate::importance;
use crate::store::MemoryStore;
use chrono::Utc;
use companion_core::config::MemoryConfig;
use companion_core::model::{
    Emotion, GameEvent, MemoryKind, MemoryRecord, PropertyMap, ScoredMemory,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Result of `GetContext`: the merged records plus whether semantic search
/// was unavailable and the result fell back to temporal-only.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub records: Vec<MemoryRecord>,
    pub degraded: bool,
}

pub struct MemoryEngine {
    store: MemoryStore,
    config: MemoryConfig,
    embedder: Mutex<Option<Arc<Embedder>>>,
}

impl MemoryEngine {
    pub fn new(store: MemoryStore, config: MemoryConfig) -> Self {
        let embedder = match Embedder::new() {
            Ok(e) => Some(Arc::new(e)),
            Err(e) => {
                tracing::warn!("embedding backend unavailable at startup, appends will mark embedding_pending: {}", e);
                None
            }
        };
        Self {
            store,
            config,
            embedder: Mutex::new(embedder),
        }
    }

    /// Score importance, embed the content, and persist. Embedding failure
    /// never fails the append — the record is stored with `embedding_pending`
    /// set and a later call to `retry_pending_embeddings` backfills it.
    pub async fn append(
        &self,
        tenant: &str,
        player: &str,
        kind: MemoryKind,
        content: String,
        emotion: Option<Emotion>,
        payload: PropertyMap,
        context: PropertyMap,
    ) -> anyhow::Result<MemoryRecord> {
        let importance = importance::score(kind, emotion, &payload, &context);
        let embedder = self.embedder.lock().await.clone();
        let embedding = match &embedder {
            Some(model) => match model.embed(&content) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("embedding failed for append, marking pending: {}", e);
                    None
                }
            },
            None => None,
        };

        let record = MemoryRecord {
            id: Uuid::new_v4(),
            tenant: tenant.to_string(),
            player: player.to_string(),
            kind,
            content,
            emotion,
            importance,
            context,
            embedding_pending: embedding.is_none(),
            embedding,
            created_at: Utc::now(),
        };

        self.store.insert(&record).await?;
        Ok(record)
    }

    /// Temporal slice merged with a semantic slice of the event's textual
    /// description, scored by `0.6*importance + 0.4*recency`. Falls back to
    /// temporal-only, `degraded=true`, if the embedding backend is down.
    pub async fn get_context(
        &self,
        tenant: &str,
        player: &str,
        event: &GameEvent,
        k: usize,
    ) -> anyhow::Result<MemoryContext> {
        let floor = self.config.importance_floor;
        let temporal = self
            .store
            .fetch_recent(tenant, player, floor, k as i64)
            .await?;

        let embedder = self.embedder.lock().await.clone();
        let Some(embedder) = embedder else {
            return Ok(MemoryContext { records: temporal, degraded: true });
        };

        let query_text = event_text(event);
        let query_embedding = match embedder.embed(&query_text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("query embedding failed, falling back to temporal context: {}", e);
                return Ok(MemoryContext { records: temporal, degraded: true });
            }
        };

        let candidates = self.store.fetch_with_embeddings(tenant, player, floor).await?;
        let mut semantic: Vec<MemoryRecord> = candidates
            .into_iter()
            .filter(|r| {
                r.embedding
                    .as_ref()
                    .map(|e| cosine_similarity(e, &query_embedding) > 0.0)
                    .unwrap_or(false)
            })
            .collect();
        semantic.sort_by(|a, b| {
            let sa = cosine_similarity(a.embedding.as_deref().unwrap_or(&[]), &query_embedding);
            let sb = cosine_similarity(b.embedding.as_deref().unwrap_or(&[]), &query_embedding);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        semantic.truncate(k);

        let mut merged: Vec<MemoryRecord> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for record in temporal.into_iter().chain(semantic) {
            if seen.insert(record.id) {
                merged.push(record);
            }
        }

        let now = Utc::now();
        merged.sort_by(|a, b| combined_rank(b, now).partial_cmp(&combined_rank(a, now)).unwrap_or(std::cmp::Ordering::Equal));
        merged.truncate(k);

        Ok(MemoryContext { records: merged, degraded: false })
    }

    pub async fn search(
        &self,
        tenant: &str,
        player: &str,
        query: &str,
        k: usize,
        min_importance: Option<f32>,
    ) -> anyhow::Result<Vec<ScoredMemory>> {
        let threshold = min_importance.unwrap_or(self.config.importance_floor);
        let embedder = self.embedder.lock().await.clone();
        let Some(embedder) = embedder else {
            return Ok(Vec::new());
        };
        let query_embedding = embedder.embed(query)?;

        let candidates = self.store.fetch_with_embeddings(tenant, player, threshold).await?;
        let mut scored: Vec<ScoredMemory> = candidates
            .into_iter()
            .filter_map(|record| {
                let score = cosine_similarity(record.embedding.as_deref().unwrap_or(&[]), &query_embedding);
                (score > 0.0).then_some(ScoredMemory { record, score })
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub async fn cleanup(
        &self,
        tenant: &str,
        player: &str,
        min_importance: f32,
        max_age_days: Option<f64>,
    ) -> anyhow::Result<u64> {
        self.store.cleanup(tenant, player, min_importance, max_age_days).await
    }

    pub async fn decay_tick(&self) -> anyhow::Result<u64> {
        self.store.decay_all(Utc::now()).await
    }

    /// Attempt to (re)initialize the embedding backend if it's down, then
    /// backfill up to `limit` records still marked `embedding_pending`.
    pub async fn retry_pending_embeddings(&self, limit: i64) -> anyhow::Result<usize> {
        let mut guard = self.embedder.lock().await;
        if guard.is_none() {
            match Embedder::new() {
                Ok(e) => *guard = Some(Arc::new(e)),
                Err(e) => {
                    tracing::debug!("embedding backend still unavailable: {}", e);
                    return Ok(0);
                }
            }
        }
        let embedder = guard.clone().expect("just checked Some");
        drop(guard);

        let pending = self.store.fetch_pending_embeddings(limit).await?;
        let mut fixed = 0;
        for record in pending {
            match embedder.embed(&record.content) {
                Ok(vec) => {
                    self.store.set_embedding(record.id, &vec).await?;
                    fixed += 1;
                }
                Err(e) => {
                    tracing::debug!("retry embedding failed for {}: {}", record.id, e);
                }
            }
        }
        Ok(fixed)
    }
}

fn combined_rank(record: &MemoryRecord, now: chrono::DateTime<Utc>) -> f32 {
    let age_days = (now - record.created_at).num_seconds() as f32 / 86_400.0;
    let recency = (-age_days / 14.0).exp();
    0.6 * record.importance + 0.4 * recency
}

fn event_text(event: &GameEvent) -> String {
    let mut parts = vec![event.kind.as_str().to_string()];
    if let Some(r) = event.context.rarity() {
        parts.push(r.to_string());
    }
    if event.payload.mvp() {
        parts.push("mvp".to_string());
    }
    if let Some(d) = event.context.difficulty() {
        parts.push(d.to_string());
    }
    parts.join(" ")
}
