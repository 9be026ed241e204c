//! Template lookup with the documented fallback chain, weighted-random pick
//! stable under the fingerprint seed, and payload substitution.

use crate::templates;
use companion_core::model::{Emotion, EventKind, GameEvent, Language, Persona};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct TemplateChoice {
    pub text: String,
    pub persona: Persona,
    pub language: Language,
}

/// `(kind, emotion, persona, language)` → same tuple with `persona=cheerful`
/// → same tuple with `language=en` → a static `(kind, language)` line.
pub fn choose(kind: EventKind, emotion: Emotion, persona: Persona, language: Language, seed: u64, event: &GameEvent) -> TemplateChoice {
    if let Some(lines) = templates::lookup(kind, emotion, persona, language) {
        return render(lines, persona, language, seed, event);
    }
    if persona != Persona::Cheerful {
        if let Some(lines) = templates::lookup(kind, emotion, Persona::Cheerful, language) {
            return render(lines, Persona::Cheerful, language, seed, event);
        }
    }
    if language != Language::En {
        if let Some(lines) = templates::lookup(kind, emotion, Persona::Cheerful, Language::En) {
            return render(lines, Persona::Cheerful, Language::En, seed, event);
        }
    }
    TemplateChoice {
        text: substitute(templates::neutral_line(kind, language), event),
        persona,
        language,
    }
}

fn render(lines: &[&str], persona: Persona, language: Language, seed: u64, event: &GameEvent) -> TemplateChoice {
    let mut rng = StdRng::seed_from_u64(seed);
    let idx = rng.gen_range(0..lines.len());
    TemplateChoice {
        text: substitute(lines[idx], event),
        persona,
        language,
    }
}

fn substitute(template: &str, event: &GameEvent) -> String {
    let nickname = event.context.get_str("nickname").unwrap_or("friend");
    let count = event
        .payload
        .win_streak()
        .max(event.payload.loss_streak())
        .max(event.payload.kill_count());
    template.replace("{nickname}", nickname).replace("{count}", &count.to_string())
}
