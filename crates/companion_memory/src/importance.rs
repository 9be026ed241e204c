//! Importance scoring and decay for stored memory records.

use companion_core::model::{Emotion, MemoryKind, PropertyMap};

/// Base 0.5, plus bumps for memorable kinds, boosting emotions, rarity,
/// MVP/legendary status, and long streaks. Clamped to [0, 1].
pub fn score(kind: MemoryKind, emotion: Option<Emotion>, payload: &PropertyMap, context: &PropertyMap) -> f32 {
    let mut score: f32 = 0.5;

    if kind.is_always_memorable() {
        score += 0.2;
    }
    if emotion.map(|e| e.boosts_importance()).unwrap_or(false) {
        score += 0.15;
    }
    if context.is_high_rarity() {
        score += 0.15;
    }
    if payload.mvp() || payload.is_legendary() {
        score += 0.10;
    }
    if payload.win_streak().abs() >= 5 || payload.loss_streak().abs() >= 5 {
        score += 0.10;
    }

    score.clamp(0.0, 1.0)
}

/// Daily decay: subtract `0.01 * days_since_created` from the current
/// importance, never below `initial_importance * 0.3`.
pub fn decay(initial_importance: f32, current_importance: f32, days_since_created: f64) -> f32 {
    let floor = initial_importance * 0.3;
    let decayed = current_importance - 0.01 * days_since_created as f32;
    decayed.max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion_core::model::MemoryKind;

    #[test]
    fn base_score_for_plain_observation() {
        let s = score(MemoryKind::Observation, None, &PropertyMap::default(), &PropertyMap::default());
        assert!((s - 0.5).abs() < 1e-6);
    }

    #[test]
    fn memorable_kind_and_boosting_emotion_stack() {
        let s = score(MemoryKind::Achievement, Some(Emotion::Excited), &PropertyMap::default(), &PropertyMap::default());
        assert!((s - 0.85).abs() < 1e-6);
    }

    #[test]
    fn score_never_exceeds_one() {
        let mut payload = PropertyMap::default();
        payload.extra.insert("mvp".into(), true.into());
        payload.extra.insert("win_streak".into(), 10.into());
        let mut context = PropertyMap::default();
        context.extra.insert("rarity".into(), "legendary".into());
        let s = score(MemoryKind::Dramatic, Some(Emotion::Amazed), &payload, &context);
        assert!(s <= 1.0);
    }

    #[test]
    fn mvp_bonus_reads_from_payload_not_context() {
        let mut payload = PropertyMap::default();
        payload.extra.insert("mvp".into(), true.into());
        let s = score(MemoryKind::Event, None, &payload, &PropertyMap::default());
        assert!((s - 0.6).abs() < 1e-6);
    }

    #[test]
    fn decay_respects_floor() {
        let d = decay(0.8, 0.5, 1000.0);
        assert!((d - 0.8 * 0.3).abs() < 1e-6);
    }

    #[test]
    fn decay_reduces_by_rate() {
        let d = decay(0.8, 0.8, 5.0);
        assert!((d - (0.8 - 0.05)).abs() < 1e-6);
    }
}
