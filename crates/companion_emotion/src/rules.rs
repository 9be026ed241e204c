//! Pass 1: a deterministic, priority-ordered rule table. Rules are tried
//! most-specific to least-specific; the first match wins and costs nothing.

use companion_core::model::{Emotion, EventKind, GameEvent};

#[derive(Debug, Clone, Copy)]
pub struct RuleOutcome {
    pub emotion: Emotion,
    pub intensity: f32,
    pub confidence: f32,
    pub action: &'static str,
    pub name: &'static str,
}

type RuleFn = fn(&GameEvent) -> bool;

struct Rule {
    name: &'static str,
    matches: RuleFn,
    outcome: fn() -> (Emotion, f32, f32, &'static str),
}

fn rule_table() -> &'static [Rule] {
    &[
        Rule {
            name: "victory_mvp_streak",
            matches: |e| e.kind == EventKind::Victory && e.payload.mvp() && e.payload.win_streak() >= 5,
            outcome: || (Emotion::Excited, 0.9, 0.95, "celebrate"),
        },
        Rule {
            name: "victory_mvp",
            matches: |e| e.kind == EventKind::Victory && e.payload.mvp(),
            outcome: || (Emotion::Excited, 0.8, 0.9, "celebrate"),
        },
        Rule {
            name: "victory_streak",
            matches: |e| e.kind == EventKind::Victory && e.payload.win_streak() >= 5,
            outcome: || (Emotion::Proud, 0.85, 0.9, "cheer"),
        },
        Rule {
            name: "victory_plain",
            matches: |e| e.kind == EventKind::Victory,
            outcome: || (Emotion::Happy, 0.6, 0.8, "cheer"),
        },
        Rule {
            name: "boss_defeated",
            matches: |e| e.kind == EventKind::CombatBossDefeated,
            outcome: || (Emotion::Excited, 0.85, 0.9, "celebrate"),
        },
        Rule {
            name: "defeat_losing_streak",
            matches: |e| e.kind == EventKind::Defeat && e.payload.loss_streak() >= 5,
            outcome: || (Emotion::Disappointed, 0.7, 0.85, "sulk"),
        },
        Rule {
            name: "death_in_combat",
            matches: |e| e.kind == EventKind::Death && e.context.in_combat(),
            outcome: || (Emotion::Frustrated, 0.6, 0.75, "sulk"),
        },
        Rule {
            name: "achievement_rare",
            matches: |e| e.kind == EventKind::Achievement && e.context.is_high_rarity(),
            outcome: || (Emotion::Amazed, 0.85, 0.9, "celebrate"),
        },
        Rule {
            name: "achievement_plain",
            matches: |e| e.kind == EventKind::Achievement,
            outcome: || (Emotion::Proud, 0.7, 0.85, "cheer"),
        },
        Rule {
            name: "loot_rare",
            matches: |e| e.kind == EventKind::Loot && e.context.is_high_rarity(),
            outcome: || (Emotion::Amazed, 0.8, 0.85, "celebrate"),
        },
        Rule {
            name: "level_up",
            matches: |e| e.kind == EventKind::LevelUp,
            outcome: || (Emotion::Happy, 0.6, 0.8, "cheer"),
        },
        Rule {
            name: "kill_spree",
            matches: |e| e.kind == EventKind::Kill && e.payload.kill_count() >= 10,
            outcome: || (Emotion::Proud, 0.7, 0.8, "cheer"),
        },
        Rule {
            name: "session_boundary",
            matches: |e| matches!(e.kind, EventKind::SessionStart | EventKind::SessionEnd),
            outcome: || (Emotion::Calm, 0.3, 0.6, "idle"),
        },
    ]
}

/// Evaluate the table in order; `None` means abstention, not an error —
/// the caller falls through to the classifier pass.
pub fn evaluate(event: &GameEvent) -> Option<RuleOutcome> {
    for rule in rule_table() {
        if (rule.matches)(event) {
            let (emotion, intensity, confidence, action) = (rule.outcome)();
            return Some(RuleOutcome {
                emotion,
                intensity,
                confidence,
                action,
                name: rule.name,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use companion_core::model::PropertyMap;

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

    fn props(pairs: &[(&str, serde_json::Value)]) -> PropertyMap {
        PropertyMap {
            extra: pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    #[test]
    fn most_specific_victory_rule_wins() {
        let e = event(EventKind::Victory, props(&[("mvp", true.into()), ("win_streak", 7.into())]));
        let outcome = evaluate(&e).unwrap();
        assert_eq!(outcome.name, "victory_mvp_streak");
        assert_eq!(outcome.emotion, Emotion::Excited);
    }

    #[test]
    fn plain_victory_falls_to_least_specific_tier() {
        let e = event(EventKind::Victory, PropertyMap::default());
        let outcome = evaluate(&e).unwrap();
        assert_eq!(outcome.name, "victory_plain");
    }

    #[test]
    fn unmatched_event_abstains() {
        let e = event(EventKind::CombatStart, PropertyMap::default());
        assert!(evaluate(&e).is_none());
    }

    #[test]
    fn kill_without_spree_abstains() {
        let e = event(EventKind::Kill, props(&[("kill_count", 2.into())]));
        assert!(evaluate(&e).is_none());
    }

    #[test]
    fn rare_achievement_reads_rarity_from_context() {
        let mut e = event(EventKind::Achievement, PropertyMap::default());
        e.context = props(&[("rarity", "legendary".into())]);
        let outcome = evaluate(&e).unwrap();
        assert_eq!(outcome.name, "achievement_rare");
    }
}
