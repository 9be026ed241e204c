//! Generative path: prompt assembly (persona, language, up to 3 memory
//! summaries, emotion, payload — persona and language directives are never
//! dropped, memory summaries are the first thing trimmed) and
//! post-processing of the model's reply.

use companion_core::model::{Emotion, EventKind, Language, Persona};

const MAX_GLYPHS: usize = 140;
const MAX_MEMORY_SUMMARIES: usize = 3;

pub fn build_prompt(
    kind: EventKind,
    emotion: Emotion,
    persona: Persona,
    language: Language,
    memory_summaries: &[String],
    payload_facts: &str,
) -> (String, String) {
    let system = format!(
        "You are a game companion with a {} personality. Reply only in {}. Keep it under {} characters, one short line, no markdown.",
        persona.as_str(),
        language_name(language),
        MAX_GLYPHS
    );

    let mut parts = vec![format!("event={}", kind.as_str()), format!("emotion={}", emotion.as_str())];
    if !payload_facts.is_empty() {
        parts.push(payload_facts.to_string());
    }
    for summary in memory_summaries.iter().take(MAX_MEMORY_SUMMARIES) {
        parts.push(format!("memory: {}", summary));
    }

    (system, parts.join(". "))
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Zh => "Chinese",
        Language::En => "English",
        Language::Ja => "Japanese",
        Language::Ko => "Korean",
    }
}

/// Length clamp and markdown strip. Returns `None` if the reply fails the
/// cheap script/character check for `language` — the caller reverts to the
/// template path in that case.
pub fn post_process(raw: &str, language: Language) -> Option<String> {
    let stripped = strip_markdown(raw);
    let clamped: String = stripped.chars().take(MAX_GLYPHS).collect();
    let clamped = clamped.trim().to_string();

    if clamped.is_empty() || !script_matches(&clamped, language) {
        return None;
    }
    Some(clamped)
}

fn strip_markdown(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '#'))
        .collect()
}

/// Cheap heuristic: for CJK languages, require at least one character in
/// the language's Unicode block; for English, require the text to be
/// mostly ASCII.
fn script_matches(text: &str, language: Language) -> bool {
    match language {
        Language::Zh => text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)),
        Language::Ja => text.chars().any(|c| ('\u{3040}'..='\u{30ff}').contains(&c) || ('\u{4e00}'..='\u{9fff}').contains(&c)),
        Language::Ko => text.chars().any(|c| ('\u{ac00}'..='\u{d7a3}').contains(&c)),
        Language::En => {
            let non_ascii = text.chars().filter(|c| !c.is_ascii()).count();
            non_ascii * 4 < text.chars().count().max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_persona_and_kind() {
        let (system, _) = build_prompt(EventKind::Victory, Emotion::Excited, Persona::Cool, Language::En, &[], "");
        assert!(system.contains("cool"));
        assert!(system.contains("English"));
    }

    #[test]
    fn prompt_caps_memory_summaries_at_three() {
        let summaries = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let (_, user) = build_prompt(EventKind::Victory, Emotion::Excited, Persona::Cool, Language::En, &summaries, "");
        assert!(user.contains("memory: a"));
        assert!(!user.contains("memory: d"));
    }

    #[test]
    fn post_process_clamps_length() {
        let long = "x".repeat(300);
        let result = post_process(&long, Language::En).unwrap();
        assert!(result.chars().count() <= MAX_GLYPHS);
    }

    #[test]
    fn post_process_strips_markdown() {
        let result = post_process("**hello** there", Language::En).unwrap();
        assert!(!result.contains('*'));
    }

    #[test]
    fn post_process_rejects_language_mismatch() {
        assert!(post_process("Great job out there!", Language::Zh).is_none());
    }

    #[test]
    fn post_process_accepts_matching_chinese() {
        assert!(post_process("干得漂亮", Language::Zh).is_some());
    }
}
