//! Dialogue Engine: special-case detection gates an optional paid
//! generative path; everything else is free template selection.

use crate::{generative, select, special_case};
use companion_budget::{Admission, BudgetGovernor};
use companion_core::model::{Component, DialogueMethod, DialogueResult, Emotion, GameEvent, Language, Persona, TenantContext};
use companion_llm::{CompletionParams, GenerativeClient};
use std::sync::Arc;
use std::time::Instant;

pub struct DialogueEngine {
    generative: Arc<dyn GenerativeClient>,
    budget: Arc<BudgetGovernor>,
    model: String,
}

impl DialogueEngine {
    pub fn new(generative: Arc<dyn GenerativeClient>, budget: Arc<BudgetGovernor>, model: String) -> Self {
        Self { generative, budget, model }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn generate(
        &self,
        event: &GameEvent,
        emotion: Emotion,
        persona: Persona,
        language: Language,
        memory_summaries: &[String],
        tenant: &TenantContext,
        fingerprint_seed: u64,
        force_generative: bool,
    ) -> anyhow::Result<DialogueResult> {
        let start = Instant::now();
        let reasons = special_case::detect(event, memory_summaries.len());
        let used_special_case = force_generative || !reasons.is_empty();

        if used_special_case && !tenant.force_generative_off {
            if let Some(result) = self
                .try_generative(event, emotion, persona, language, memory_summaries, tenant, &reasons, used_special_case, start)
                .await?
            {
                return Ok(result);
            }
        }

        let choice = select::choose(event.kind, emotion, persona, language, fingerprint_seed, event);
        Ok(DialogueResult {
            text: choice.text,
            language: choice.language,
            persona: choice.persona,
            method: DialogueMethod::Template,
            used_special_case,
            special_case_reasons: reasons,
            memory_count: memory_summaries.len(),
            latency_ms: start.elapsed().as_millis() as u64,
            cost_usd: 0.0,
            fallback_reason: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_generative(
        &self,
        event: &GameEvent,
        emotion: Emotion,
        persona: Persona,
        language: Language,
        memory_summaries: &[String],
        tenant: &TenantContext,
        reasons: &[String],
        used_special_case: bool,
        start: Instant,
    ) -> anyhow::Result<Option<DialogueResult>> {
        let payload_facts = format!("payload_keys={}", event.payload.normalized_keys().join(","));
        let (system, user) = generative::build_prompt(event.kind, emotion, persona, language, memory_summaries, &payload_facts);
        let params = CompletionParams { max_tokens: 80, temperature: 0.8 };
        let estimated_tokens_in = ((system.len() + user.len()) / 4).max(1) as u64;
        let estimated_cost = companion_llm::pricing::estimate_cost(&self.model, estimated_tokens_in, params.max_tokens as u64);

        let admission = self
            .budget
            .admit(&tenant.tenant_id, tenant.daily_budget_usd, Component::Dialogue, estimated_cost, reasons.len() >= 2)
            .await?;
        if admission != Admission::Allow {
            return Ok(None);
        }

        let outcome = match self.generative.generate(&system, &user, params).await {
            Ok(o) => o,
            Err(e) => {
                self.budget.release(&tenant.tenant_id, estimated_cost).await?;
                tracing::warn!("generative call failed, falling back to template: {}", e);
                return Ok(None);
            }
        };

        let actual_cost = companion_llm::pricing::estimate_cost(&self.model, outcome.tokens_in, outcome.tokens_out);
        self.budget.record(&tenant.tenant_id, estimated_cost, actual_cost).await?;

        match generative::post_process(&outcome.text, language) {
            Some(text) => Ok(Some(DialogueResult {
                text,
                language,
                persona,
                method: DialogueMethod::Generative,
                used_special_case,
                special_case_reasons: reasons.to_vec(),
                memory_count: memory_summaries.len(),
                latency_ms: start.elapsed().as_millis() as u64,
                cost_usd: actual_cost,
                fallback_reason: None,
            })),
            None => {
                tracing::warn!("generative reply failed post-processing, falling back to template");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use companion_budget::SharedStore;
    use companion_core::config::BudgetConfig;
    use companion_core::model::{EventKind, PropertyMap, TenantTier};
    use companion_llm::providers::mock::MockGenerative;

    fn tenant(daily_budget_usd: f64, force_generative_off: bool) -> TenantContext {
        TenantContext {
            tenant_id: "t1".into(),
            tier: TenantTier::Standard,
            daily_budget_usd,
            force_generative_off,
            language_whitelist: vec![],
        }
    }

    fn event(kind: EventKind, payload: PropertyMap) -> GameEvent {
        GameEvent {
            tenant: "t1".into(),
            game: "g1".into(),
            player: "p1".into(),
            kind,
            payload,
            context: PropertyMap::default(),
            client_seq: 1,
            received_at: Utc::now(),
        }
    }

    async fn engine() -> DialogueEngine {
        let store = SharedStore::in_memory().await.unwrap();
        let budget = Arc::new(BudgetGovernor::new(store, BudgetConfig::default()));
        DialogueEngine::new(Arc::new(MockGenerative), budget, "mock".to_string())
    }

    #[tokio::test]
    async fn plain_event_uses_template_path() {
        let engine = engine().await;
        let event = event(EventKind::Victory, PropertyMap::default());
        let result = engine
            .generate(&event, Emotion::Excited, Persona::Cheerful, Language::En, &[], &tenant(10.0, false), 1, false)
            .await
            .unwrap();
        assert_eq!(result.method, DialogueMethod::Template);
        assert_eq!(result.cost_usd, 0.0);
        assert!(result.upholds_cheap_cost_invariant());
    }

    #[tokio::test]
    async fn special_case_with_budget_uses_generative_path() {
        let engine = engine().await;
        let mut payload = PropertyMap::default();
        payload.extra.insert("win_streak".into(), serde_json::json!(6));
        let event = event(EventKind::Victory, payload);
        let result = engine
            .generate(&event, Emotion::Excited, Persona::Cheerful, Language::En, &[], &tenant(10.0, false), 1, false)
            .await
            .unwrap();
        assert_eq!(result.method, DialogueMethod::Generative);
        assert!(result.used_special_case);
    }

    #[tokio::test]
    async fn force_generative_off_stays_on_template() {
        let engine = engine().await;
        let mut payload = PropertyMap::default();
        payload.extra.insert("win_streak".into(), serde_json::json!(6));
        let event = event(EventKind::Victory, payload);
        let result = engine
            .generate(&event, Emotion::Excited, Persona::Cheerful, Language::En, &[], &tenant(10.0, true), 1, false)
            .await
            .unwrap();
        assert_eq!(result.method, DialogueMethod::Template);
    }

    #[tokio::test]
    async fn depleted_budget_falls_back_to_template() {
        let engine = engine().await;
        let mut payload = PropertyMap::default();
        payload.extra.insert("win_streak".into(), serde_json::json!(6));
        let event = event(EventKind::Victory, payload);
        let result = engine
            .generate(&event, Emotion::Excited, Persona::Cheerful, Language::En, &[], &tenant(0.0, false), 1, false)
            .await
            .unwrap();
        assert_eq!(result.method, DialogueMethod::Template);
        assert_eq!(result.cost_usd, 0.0);
    }
}
