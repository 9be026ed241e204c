//! Integration tests for DialogueEngine, exercising it as a consumer would:
//! through its public API, backed by the mock generative client and an
//! in-memory budget store rather than any internal test-only scaffolding.

use chrono::Utc;
use companion_budget::{BudgetGovernor, SharedStore};
use companion_core::config::BudgetConfig;
use companion_core::model::{
    DialogueMethod, EventKind, GameEvent, Language, Persona, PropertyMap, TenantContext, TenantTier,
};
use companion_dialogue::DialogueEngine;
use companion_llm::providers::mock::MockGenerative;
use std::sync::Arc;

fn tenant(daily_budget_usd: f64) -> TenantContext {
    TenantContext {
        tenant_id: "acme".into(),
        tier: TenantTier::Standard,
        daily_budget_usd,
        force_generative_off: false,
        language_whitelist: vec![],
    }
}

fn event(kind: EventKind, payload: PropertyMap, context: PropertyMap) -> GameEvent {
    GameEvent {
        tenant: "acme".into(),
        game: "g1".into(),
        player: "p1".into(),
        kind,
        payload,
        context,
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
async fn a_plain_victory_costs_nothing_and_is_deterministic() {
    let engine = engine().await;
    let event = event(EventKind::Victory, PropertyMap::default(), PropertyMap::default());
    let tenant = tenant(10.0);

    let first = engine
        .generate(&event, companion_core::model::Emotion::Happy, Persona::Cheerful, Language::En, &[], &tenant, 42, false)
        .await
        .unwrap();
    let second = engine
        .generate(&event, companion_core::model::Emotion::Happy, Persona::Cheerful, Language::En, &[], &tenant, 42, false)
        .await
        .unwrap();

    assert_eq!(first.method, DialogueMethod::Template);
    assert_eq!(first.cost_usd, 0.0);
    assert_eq!(first.text, second.text);
}

#[tokio::test]
async fn a_win_streak_in_payload_triggers_the_paid_path() {
    let engine = engine().await;
    let mut payload = PropertyMap::default();
    payload.extra.insert("win_streak".into(), serde_json::json!(6));
    let event = event(EventKind::Victory, payload, PropertyMap::default());

    let result = engine
        .generate(&event, companion_core::model::Emotion::Excited, Persona::Cheerful, Language::En, &[], &tenant(10.0), 1, false)
        .await
        .unwrap();

    assert_eq!(result.method, DialogueMethod::Generative);
    assert!(result.used_special_case);
    assert!(result.special_case_reasons.contains(&"win_streak".to_string()));
    assert!(result.cost_usd > 0.0);
}

#[tokio::test]
async fn legendary_rarity_in_context_also_triggers_the_paid_path() {
    let engine = engine().await;
    let mut context = PropertyMap::default();
    context.extra.insert("rarity".into(), serde_json::json!("legendary"));
    let event = event(EventKind::Loot, PropertyMap::default(), context);

    let result = engine
        .generate(&event, companion_core::model::Emotion::Amazed, Persona::Cheerful, Language::En, &[], &tenant(10.0), 1, false)
        .await
        .unwrap();

    assert_eq!(result.method, DialogueMethod::Generative);
    assert!(result.special_case_reasons.contains(&"high_rarity".to_string()));
}
