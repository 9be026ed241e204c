//! Emotion Engine: deterministic rule pass, then a budget-gated classifier
//! pass on rule abstention.

use crate::action::action_for;
use crate::{prompt, rules};
use companion_budget::{Admission, BudgetGovernor};
use companion_core::model::{Component, Emotion, EmotionMethod, EmotionResult, GameEvent, TenantContext};
use companion_llm::{ClassifierClient, CompletionParams};
use std::sync::Arc;
use std::time::Instant;

const RULE_ABSTENTION_FALLBACK_ACTION: &str = "idle";

pub struct EmotionEngine {
    classifier: Arc<dyn ClassifierClient>,
    budget: Arc<BudgetGovernor>,
    model: String,
    classifier_params: CompletionParams,
}

impl EmotionEngine {
    pub fn new(classifier: Arc<dyn ClassifierClient>, budget: Arc<BudgetGovernor>, model: String) -> Self {
        Self {
            classifier,
            budget,
            model,
            classifier_params: CompletionParams { max_tokens: 8, temperature: 0.0 },
        }
    }

    pub async fn analyze(
        &self,
        event: &GameEvent,
        context_summary: &str,
        tenant: &TenantContext,
        force_paid: bool,
    ) -> anyhow::Result<EmotionResult> {
        let start = Instant::now();

        if !force_paid {
            if let Some(hit) = rules::evaluate(event) {
                return Ok(EmotionResult {
                    emotion: hit.emotion,
                    intensity: hit.intensity,
                    confidence: hit.confidence,
                    action: hit.action.to_string(),
                    method: EmotionMethod::Rule,
                    reasoning: format!("rule:{}", hit.name),
                    latency_ms: start.elapsed().as_millis() as u64,
                    cost_usd: 0.0,
                });
            }
        }

        self.classify(event, context_summary, tenant, start).await
    }

    async fn classify(
        &self,
        event: &GameEvent,
        context_summary: &str,
        tenant: &TenantContext,
        start: Instant,
    ) -> anyhow::Result<EmotionResult> {
        let prompt_text = prompt::build(event, context_summary);
        let estimated_tokens_in = (prompt_text.len() / 4).max(1) as u64;
        let estimated_cost = companion_llm::pricing::estimate_cost(&self.model, estimated_tokens_in, self.classifier_params.max_tokens as u64);

        let admission = self
            .budget
            .admit(&tenant.tenant_id, tenant.daily_budget_usd, Component::Emotion, estimated_cost, true)
            .await?;

        if admission != Admission::Allow {
            return Ok(EmotionResult {
                emotion: Emotion::Neutral,
                intensity: 0.3,
                confidence: 0.3,
                action: RULE_ABSTENTION_FALLBACK_ACTION.to_string(),
                method: EmotionMethod::Rule,
                reasoning: "budget denied classifier call, abstaining".to_string(),
                latency_ms: start.elapsed().as_millis() as u64,
                cost_usd: 0.0,
            });
        }

        let outcome = match self.classifier.classify(&prompt_text, self.classifier_params).await {
            Ok(o) => o,
            Err(e) => {
                self.budget.release(&tenant.tenant_id, estimated_cost).await?;
                return Err(e);
            }
        };

        let actual_cost = companion_llm::pricing::estimate_cost(&self.model, outcome.tokens_in, outcome.tokens_out);
        self.budget.record(&tenant.tenant_id, estimated_cost, actual_cost).await?;

        let (emotion, confidence) = match Emotion::parse(&outcome.label) {
            Some(e) => (e, outcome.confidence.clamp(0.0, 1.0)),
            None => (Emotion::Neutral, outcome.confidence.min(0.5)),
        };
        let intensity = confidence;

        Ok(EmotionResult {
            emotion,
            intensity,
            confidence,
            action: action_for(emotion, intensity).to_string(),
            method: EmotionMethod::Classifier,
            reasoning: format!("classifier label={}", outcome.label),
            latency_ms: start.elapsed().as_millis() as u64,
            cost_usd: actual_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use companion_budget::SharedStore;
    use companion_core::config::BudgetConfig;
    use companion_core::model::{EventKind, PropertyMap, TenantTier};
    use companion_llm::providers::mock::MockClassifier;

    fn tenant(daily_budget_usd: f64) -> TenantContext {
        TenantContext {
            tenant_id: "t1".into(),
            tier: TenantTier::Standard,
            daily_budget_usd,
            force_generative_off: false,
            language_whitelist: vec![],
        }
    }

    fn event(kind: EventKind, context: PropertyMap) -> GameEvent {
        GameEvent {
            tenant: "t1".into(),
            game: "g1".into(),
            player: "p1".into(),
            kind,
            payload: PropertyMap::default(),
            context,
            client_seq: 1,
            received_at: Utc::now(),
        }
    }

    async fn engine() -> EmotionEngine {
        let store = SharedStore::in_memory().await.unwrap();
        let budget = Arc::new(BudgetGovernor::new(store, BudgetConfig::default()));
        EmotionEngine::new(Arc::new(MockClassifier), budget, "mock".to_string())
    }

    #[tokio::test]
    async fn rule_hit_is_free_and_immediate() {
        let engine = engine().await;
        let event = event(EventKind::Victory, PropertyMap::default());
        let result = engine.analyze(&event, "", &tenant(10.0), false).await.unwrap();
        assert_eq!(result.method, EmotionMethod::Rule);
        assert_eq!(result.cost_usd, 0.0);
        assert!(result.upholds_rule_cost_invariant());
    }

    #[tokio::test]
    async fn abstention_falls_through_to_classifier() {
        let engine = engine().await;
        let event = event(EventKind::CombatStart, PropertyMap::default());
        let result = engine.analyze(&event, "", &tenant(10.0), false).await.unwrap();
        assert_eq!(result.method, EmotionMethod::Classifier);
    }

    #[tokio::test]
    async fn depleted_budget_returns_abstention_fallback() {
        let engine = engine().await;
        let event = event(EventKind::CombatStart, PropertyMap::default());
        let result = engine.analyze(&event, "", &tenant(0.0), false).await.unwrap();
        assert_eq!(result.emotion, Emotion::Neutral);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.cost_usd, 0.0);
    }
}
