//! Cost & Metric Sink: fire-and-forget recording of every call's
//! `{component, method, latency, cost, cache_hit}`.
//!
//! Metrics are observational, not authoritative for billing — the Budget
//! Governor's ledger is — so losing a batch on shutdown is acceptable.
//! Writes are batched in a background task fed by a bounded channel, the
//! same fan-in-then-drain shape the gateway uses for its response
//! dispatcher.

use crate::store::SharedStore;
use companion_core::model::CostMetric;
use std::time::Duration;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 4096;
const BATCH_SIZE: usize = 64;
const FLUSH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct CostSink {
    tx: mpsc::Sender<CostMetric>,
}

impl CostSink {
    /// Start the sink's background batching task. Drop the returned
    /// `CostSink` (or the last clone) to let the drain loop finish up and
    /// exit.
    pub fn spawn(store: SharedStore) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(drain_loop(store, rx));
        Self { tx }
    }

    /// Record a metric. Never blocks the caller on I/O; if the channel is
    /// full the metric is dropped and a warning logged — metrics loss is
    /// acceptable.
    pub fn record(&self, metric: CostMetric) {
        if self.tx.try_send(metric).is_err() {
            tracing::warn!("cost sink channel full or closed, dropping metric");
        }
    }
}

async fn drain_loop(store: SharedStore, mut rx: mpsc::Receiver<CostMetric>) {
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut interval = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            maybe_metric = rx.recv() => {
                match maybe_metric {
                    Some(metric) => {
                        batch.push(metric);
                        if batch.len() >= BATCH_SIZE {
                            flush(&store, &mut batch).await;
                        }
                    }
                    None => {
                        flush(&store, &mut batch).await;
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                if !batch.is_empty() {
                    flush(&store, &mut batch).await;
                }
            }
        }
    }
}

async fn flush(store: &SharedStore, batch: &mut Vec<CostMetric>) {
    if batch.is_empty() {
        return;
    }
    for metric in batch.drain(..) {
        let result = sqlx::query(
            r#"
            INSERT INTO cost_metrics
                (tenant, game, player, component, operation, latency_ms, status_code, cost_usd, cache_hit, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&metric.tenant)
        .bind(&metric.game)
        .bind(&metric.player)
        .bind(serde_json::to_string(&metric.component).unwrap_or_default())
        .bind(&metric.operation)
        .bind(metric.latency_ms as i64)
        .bind(metric.status_code as i64)
        .bind(metric.cost_usd)
        .bind(metric.cache_hit as i64)
        .bind(metric.timestamp.timestamp())
        .execute(&store.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("failed to persist cost metric, dropping batch entry: {}", e);
        }
    }
}
