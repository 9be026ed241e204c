//! Budget Governor: per-tenant daily cost ceiling, admission and recording
//! for paid calls.
//!
//! `admit` is a single SQL statement executed against a pool capped at one
//! connection, so the read-compare-write that decides admission can never
//! interleave with a concurrent caller's attempt.

use crate::store::SharedStore;
use chrono::Utc;
use companion_core::config::BudgetConfig;
use companion_core::model::{BudgetBucket, Component};
use sqlx::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny,
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }
}

pub struct BudgetGovernor {
    store: SharedStore,
    config: BudgetConfig,
}

impl BudgetGovernor {
    pub fn new(store: SharedStore, config: BudgetConfig) -> Self {
        Self { store, config }
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    async fn ensure_row(&self, tenant: &str, day: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO budget_buckets (tenant, day, spent_usd, denied_count, generative_count, classifier_count) VALUES (?, ?, 0, 0, 0, 0)",
        )
        .bind(tenant)
        .bind(day)
        .execute(&self.store.pool)
        .await?;
        Ok(())
    }

    /// Reserve `estimated_cost_usd` against the tenant's daily ceiling.
    ///
    /// `high_value` marks calls still admitted past the 80%-spent throttle
    /// (special-case reasons ≥ 2, or classifier-on-rule-abstention).
    pub async fn admit(
        &self,
        tenant: &str,
        daily_ceiling_usd: f64,
        component: Component,
        estimated_cost_usd: f64,
        high_value: bool,
    ) -> anyhow::Result<Admission> {
        let day = Self::today();
        self.ensure_row(tenant, &day).await?;

        let is_classifier = matches!(component, Component::Emotion) as i64;
        let is_generative = matches!(component, Component::Dialogue) as i64;
        let threshold = self.config.high_value_threshold_pct as f64;

        let result = sqlx::query(
            r#"
            UPDATE budget_buckets
            SET spent_usd = spent_usd + ?1,
                classifier_count = classifier_count + ?2,
                generative_count = generative_count + ?3
            WHERE tenant = ?4 AND day = ?5
              AND spent_usd + ?1 <= ?6
              AND (spent_usd < ?6 * ?7 OR ?8 = 1)
            "#,
        )
        .bind(estimated_cost_usd)
        .bind(is_classifier)
        .bind(is_generative)
        .bind(tenant)
        .bind(&day)
        .bind(daily_ceiling_usd)
        .bind(threshold)
        .bind(high_value as i64)
        .execute(&self.store.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(Admission::Allow)
        } else {
            sqlx::query(
                "UPDATE budget_buckets SET denied_count = denied_count + 1 WHERE tenant = ?1 AND day = ?2",
            )
            .bind(tenant)
            .bind(&day)
            .execute(&self.store.pool)
            .await?;
            Ok(Admission::Deny)
        }
    }

    /// Record the actual cost of a call admitted via `admit`.
    ///
    /// If `actual` exceeds `estimated` by more than 25%, the caller should
    /// emit a warning metric; this function just reconciles the ledger to
    /// the true cost.
    pub async fn record(
        &self,
        tenant: &str,
        estimated_cost_usd: f64,
        actual_cost_usd: f64,
    ) -> anyhow::Result<bool> {
        let day = Self::today();
        let delta = actual_cost_usd - estimated_cost_usd;
        if delta != 0.0 {
            sqlx::query(
                "UPDATE budget_buckets SET spent_usd = spent_usd + ?1 WHERE tenant = ?2 AND day = ?3",
            )
            .bind(delta)
            .bind(tenant)
            .bind(&day)
            .execute(&self.store.pool)
            .await?;
        }
        let overrun_warning = estimated_cost_usd > 0.0
            && (actual_cost_usd - estimated_cost_usd) / estimated_cost_usd > 0.25;
        Ok(overrun_warning)
    }

    /// Release a reservation whose call was cancelled before completion,
    /// e.g. a sub-deadline expiring before the provider responded.
    pub async fn release(&self, tenant: &str, estimated_cost_usd: f64) -> anyhow::Result<()> {
        self.record(tenant, estimated_cost_usd, 0.0).await?;
        Ok(())
    }

    pub async fn snapshot(&self, tenant: &str) -> anyhow::Result<BudgetBucket> {
        let day = Self::today();
        let row = sqlx::query(
            "SELECT spent_usd, denied_count, generative_count, classifier_count FROM budget_buckets WHERE tenant = ?1 AND day = ?2",
        )
        .bind(tenant)
        .bind(&day)
        .fetch_optional(&self.store.pool)
        .await?;

        Ok(match row {
            Some(row) => BudgetBucket {
                spent_usd: row.get::<f64, _>("spent_usd"),
                denied_count: row.get::<i64, _>("denied_count") as u64,
                generative_count: row.get::<i64, _>("generative_count") as u64,
                classifier_count: row.get::<i64, _>("classifier_count") as u64,
            },
            None => BudgetBucket::default(),
        })
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }
}
