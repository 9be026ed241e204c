//! Compact classifier prompt built from event facts and the memory context
//! summary, kept short since classifier cost scales with input tokens.

use companion_core::model::GameEvent;

pub fn build(event: &GameEvent, context_summary: &str) -> String {
    let mut facts = vec![format!("event={}", event.kind.as_str())];
    if event.payload.kill_count() > 0 {
        facts.push(format!("kill_count={}", event.payload.kill_count()));
    }
    if event.payload.win_streak() != 0 {
        facts.push(format!("win_streak={}", event.payload.win_streak()));
    }
    if event.payload.loss_streak() != 0 {
        facts.push(format!("loss_streak={}", event.payload.loss_streak()));
    }
    if event.payload.mvp() {
        facts.push("mvp=true".to_string());
    }
    if let Some(rarity) = event.context.rarity() {
        facts.push(format!("rarity={}", rarity));
    }
    if let Some(health) = event.context.player_health() {
        facts.push(format!("player_health={:.2}", health));
    }

    if context_summary.is_empty() {
        facts.join(", ")
    } else {
        format!("{}. recent memory: {}", facts.join(", "), context_summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use companion_core::model::{EventKind, PropertyMap};

    #[test]
    fn includes_event_kind_and_facts() {
        let event = GameEvent {
            tenant: "t".into(),
            game: "g".into(),
            player: "p".into(),
            kind: EventKind::Kill,
            payload: PropertyMap {
                extra: [("kill_count".to_string(), serde_json::json!(3))].into_iter().collect(),
            },
            context: PropertyMap::default(),
            client_seq: 1,
            received_at: Utc::now(),
        };
        let prompt = build(&event, "");
        assert!(prompt.contains("event=kill"));
        assert!(prompt.contains("kill_count=3"));
    }

    #[test]
    fn appends_memory_summary_when_present() {
        let event = GameEvent {
            tenant: "t".into(),
            game: "g".into(),
            player: "p".into(),
            kind: EventKind::Defeat,
            payload: PropertyMap::default(),
            context: PropertyMap::default(),
            client_seq: 1,
            received_at: Utc::now(),
        };
        let prompt = build(&event, "lost three in a row");
        assert!(prompt.contains("recent memory: lost three in a row"));
    }
}
