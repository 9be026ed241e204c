//! Signals that warrant paying for generative dialogue instead of a template.

use companion_core::model::{EventKind, GameEvent};

pub fn detect(event: &GameEvent, memory_count: usize) -> Vec<String> {
    let mut reasons = Vec::new();

    if event.context.is_high_rarity() {
        reasons.push("high_rarity".to_string());
    }
    if event.context.first_time() || event.payload.first_time() {
        reasons.push("first_time".to_string());
    }
    if event.payload.win_streak() >= 5 {
        reasons.push("win_streak".to_string());
    }
    if event.payload.loss_streak() >= 5 {
        reasons.push("loss_streak".to_string());
    }
    if event.kind == EventKind::CombatBossDefeated {
        reasons.push("boss_defeat".to_string());
    }
    if let Some(difficulty) = event.context.difficulty() {
        if difficulty != "normal" {
            reasons.push("nondefault_difficulty".to_string());
        }
    }
    if memory_count >= 3 {
        reasons.push("rich_memory_context".to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use companion_core::model::PropertyMap;

    fn event_with(payload: PropertyMap, context: PropertyMap) -> GameEvent {
        GameEvent {
            tenant: "t".into(),
            game: "g".into(),
            player: "p".into(),
            kind: EventKind::Loot,
            payload,
            context,
            client_seq: 1,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn plain_event_has_no_reasons() {
        let e = event_with(PropertyMap::default(), PropertyMap::default());
        assert!(detect(&e, 0).is_empty());
    }

    #[test]
    fn rare_loot_is_a_reason() {
        let context = PropertyMap {
            extra: [("rarity".to_string(), serde_json::json!("legendary"))].into_iter().collect(),
        };
        let e = event_with(PropertyMap::default(), context);
        assert!(detect(&e, 0).contains(&"high_rarity".to_string()));
    }

    #[test]
    fn rich_memory_context_is_a_reason() {
        let e = event_with(PropertyMap::default(), PropertyMap::default());
        assert!(detect(&e, 3).contains(&"rich_memory_context".to_string()));
    }

    #[test]
    fn multiple_signals_all_reported() {
        let payload = PropertyMap {
            extra: [("win_streak".to_string(), serde_json::json!(6))].into_iter().collect(),
        };
        let mut e = event_with(payload, PropertyMap::default());
        e.kind = EventKind::CombatBossDefeated;
        let reasons = detect(&e, 0);
        assert!(reasons.contains(&"win_streak".to_string()));
        assert!(reasons.contains(&"boss_defeat".to_string()));
    }
}
