pub mod dispatcher;
pub mod job;
pub mod push;

pub use dispatcher::Dispatcher;
pub use push::{NoopPush, PushSink};

#[cfg(test)]
mod tests {
    use super::*;
    use companion_budget::{BudgetGovernor, CostSink, ResponseCache, SharedStore};
    use companion_core::config::{BudgetConfig, DispatcherConfig, MemoryConfig};
    use companion_core::model::{EventKind, GameEvent, Language, Persona, PropertyMap, TenantContext, TenantTier};
    use companion_dialogue::DialogueEngine;
    use companion_emotion::EmotionEngine;
    use companion_llm::providers::mock::{MockClassifier, MockGenerative};
    use companion_memory::engine::MemoryEngine;
    use companion_memory::store::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    async fn dispatcher(workers: usize) -> Dispatcher {
        let memory_store = MemoryStore::in_memory().await.unwrap();
        let memory = Arc::new(MemoryEngine::new(memory_store, MemoryConfig::default()));

        let shared = SharedStore::in_memory().await.unwrap();
        let budget = Arc::new(BudgetGovernor::new(shared.clone(), BudgetConfig::default()));
        let emotion = Arc::new(EmotionEngine::new(Arc::new(MockClassifier), budget.clone(), "mock".into()));
        let dialogue = Arc::new(DialogueEngine::new(Arc::new(MockGenerative), budget, "mock".into()));

        let cache = Arc::new(ResponseCache::new(shared.clone(), 1000, 3600));
        let sink = CostSink::spawn(shared);

        let mut config = DispatcherConfig::default();
        config.workers = workers;

        Dispatcher::new(memory, emotion, dialogue, cache, sink, Arc::new(NoopPush), config, 5)
    }

    fn tenant() -> TenantContext {
        TenantContext {
            tenant_id: "t1".into(),
            tier: TenantTier::Standard,
            daily_budget_usd: 10.0,
            force_generative_off: false,
            language_whitelist: vec![],
        }
    }

    fn event(kind: EventKind) -> GameEvent {
        GameEvent {
            tenant: "t1".into(),
            game: "g1".into(),
            player: "p1".into(),
            kind,
            payload: PropertyMap::default(),
            context: PropertyMap::default(),
            client_seq: 1,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn handle_returns_a_response_for_a_plain_event() {
        let dispatcher = dispatcher(2).await;
        let response = dispatcher
            .handle(event(EventKind::Victory), tenant(), Persona::Cheerful, Language::En)
            .await
            .unwrap();
        assert!(!response.dialogue.text.is_empty());
        assert!(!response.partial);
    }

    #[tokio::test]
    async fn identical_events_hit_the_cache_on_the_second_call() {
        let dispatcher = dispatcher(2).await;
        let first = dispatcher
            .handle(event(EventKind::Victory), tenant(), Persona::Cheerful, Language::En)
            .await
            .unwrap();
        let second = dispatcher
            .handle(event(EventKind::Victory), tenant(), Persona::Cheerful, Language::En)
            .await
            .unwrap();
        assert_eq!(first.dialogue.text, second.dialogue.text);
        assert_eq!(second.emotion.method, companion_core::model::EmotionMethod::Cached);
        assert_eq!(second.dialogue.method, companion_core::model::DialogueMethod::Cached);
    }

    #[tokio::test]
    async fn tenant_mismatch_is_rejected_as_invalid() {
        let dispatcher = dispatcher(2).await;
        let mut mismatched = tenant();
        mismatched.tenant_id = "other-tenant".into();
        let err = dispatcher
            .handle(event(EventKind::Victory), mismatched, Persona::Cheerful, Language::En)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid event"));
    }

    #[tokio::test]
    async fn achievement_events_trigger_a_memory_append() {
        let dispatcher = dispatcher(1).await;
        let response = dispatcher
            .handle(event(EventKind::Achievement), tenant(), Persona::Cheerful, Language::En)
            .await
            .unwrap();
        assert!(!response.partial || response.degraded_reasons.iter().all(|r| r != "memory_unavailable"));
    }

    #[tokio::test]
    async fn handle_async_does_not_block_on_a_reply() {
        let dispatcher = dispatcher(1).await;
        dispatcher
            .handle_async(event(EventKind::Victory), tenant(), Persona::Cheerful, Language::En)
            .await
            .unwrap();
    }
}
