//! Read-only rollups over the Cost & Metric Sink's table and the Budget
//! Governor's daily buckets, for the admin/operator surface.

use crate::store::SharedStore;
use serde::Serialize;
use sqlx::Row;

#[derive(Debug, Clone, Serialize)]
pub struct TenantCostRollup {
    pub tenant: String,
    pub total_cost_usd: f64,
    pub call_count: i64,
    pub cache_hit_count: i64,
    pub today_spent_usd: f64,
    pub today_denied_count: i64,
}

pub async fn tenant_cost_rollup(store: &SharedStore, tenant: &str) -> anyhow::Result<TenantCostRollup> {
    let metrics = sqlx::query(
        "SELECT COUNT(*) as c, COALESCE(SUM(cost_usd), 0.0) as total, COALESCE(SUM(cache_hit), 0) as hits
         FROM cost_metrics WHERE tenant = ?1",
    )
    .bind(tenant)
    .fetch_one(&store.pool)
    .await?;

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let bucket = sqlx::query(
        "SELECT spent_usd, denied_count FROM budget_buckets WHERE tenant = ?1 AND day = ?2",
    )
    .bind(tenant)
    .bind(&today)
    .fetch_optional(&store.pool)
    .await?;

    let (today_spent_usd, today_denied_count) = match bucket {
        Some(row) => (row.get::<f64, _>("spent_usd"), row.get::<i64, _>("denied_count")),
        None => (0.0, 0),
    };

    Ok(TenantCostRollup {
        tenant: tenant.to_string(),
        total_cost_usd: metrics.get::<f64, _>("total"),
        call_count: metrics.get::<i64, _>("c"),
        cache_hit_count: metrics.get::<i64, _>("hits"),
        today_spent_usd,
        today_denied_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use companion_core::model::{Component, CostMetric};
    use crate::sink::CostSink;

    #[tokio::test]
    async fn rollup_reflects_recorded_metrics() {
        let store = SharedStore::in_memory().await.unwrap();
        let sink = CostSink::spawn(store.clone());
        sink.record(CostMetric {
            tenant: "t1".into(),
            game: "g1".into(),
            player: "p1".into(),
            component: Component::Dialogue,
            operation: "generate".into(),
            latency_ms: 10,
            status_code: 200,
            cost_usd: 0.02,
            cache_hit: false,
            timestamp: Utc::now(),
        });
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;

        let rollup = tenant_cost_rollup(&store, "t1").await.unwrap();
        assert_eq!(rollup.call_count, 1);
        assert!((rollup.total_cost_usd - 0.02).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_tenant_rolls_up_to_zero() {
        let store = SharedStore::in_memory().await.unwrap();
        let rollup = tenant_cost_rollup(&store, "ghost").await.unwrap();
        assert_eq!(rollup.call_count, 0);
        assert_eq!(rollup.total_cost_usd, 0.0);
    }
}
