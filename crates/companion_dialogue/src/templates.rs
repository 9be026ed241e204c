//! Authored template library keyed by `(kind, emotion, persona, language)`.
//!
//! Coverage is intentionally partial — the fallback chain in `select` covers
//! the combinations not authored here. `{nickname}` and `{count}` are
//! substituted from the event payload at selection time.

use companion_core::model::{Emotion, EventKind, Language, Persona};

type Key = (EventKind, Emotion, Persona, Language);

fn table() -> &'static [(Key, &'static [&'static str])] {
    &[
        (
            (EventKind::Victory, Emotion::Excited, Persona::Cheerful, Language::En),
            &["Yes!! {nickname}, we did it! That was amazing!", "WOW {nickname}, victory!! I'm so proud of you!"],
        ),
        (
            (EventKind::Victory, Emotion::Excited, Persona::Cool, Language::En),
            &["Nicely done, {nickname}.", "That's a win. Solid work, {nickname}."],
        ),
        (
            (EventKind::Victory, Emotion::Excited, Persona::Cute, Language::En),
            &["Yay~ {nickname} won!! >w<", "Hehe, {nickname} is the best!"],
        ),
        (
            (EventKind::Victory, Emotion::Excited, Persona::Cheerful, Language::Zh),
            &["太棒了{nickname}，我们赢了！", "{nickname}真厉害，胜利啦！"],
        ),
        (
            (EventKind::Victory, Emotion::Happy, Persona::Cheerful, Language::En),
            &["Nice win, {nickname}! Keep it up!"],
        ),
        (
            (EventKind::Victory, Emotion::Proud, Persona::Cheerful, Language::En),
            &["{count} wins in a row, {nickname}! You're on fire!"],
        ),
        (
            (EventKind::Defeat, Emotion::Disappointed, Persona::Cheerful, Language::En),
            &["Rough one, {nickname}. You'll get the next one.", "That's okay, {nickname} — shake it off."],
        ),
        (
            (EventKind::Defeat, Emotion::Disappointed, Persona::Cool, Language::En),
            &["Tough loss. Regroup, {nickname}."],
        ),
        (
            (EventKind::CombatBossDefeated, Emotion::Excited, Persona::Cheerful, Language::En),
            &["{nickname} took down the boss!! Incredible!"],
        ),
        (
            (EventKind::Death, Emotion::Frustrated, Persona::Cheerful, Language::En),
            &["Ouch, {nickname}. Watch your back out there."],
        ),
        (
            (EventKind::Achievement, Emotion::Amazed, Persona::Cheerful, Language::En),
            &["Whoa, {nickname}, that's a rare one!"],
        ),
        (
            (EventKind::Achievement, Emotion::Proud, Persona::Cheerful, Language::En),
            &["Achievement unlocked, {nickname}! Nice work."],
        ),
        (
            (EventKind::Loot, Emotion::Amazed, Persona::Cheerful, Language::En),
            &["{nickname}, look at that drop!!"],
        ),
        (
            (EventKind::LevelUp, Emotion::Happy, Persona::Cheerful, Language::En),
            &["Level up, {nickname}! You're getting stronger."],
        ),
        (
            (EventKind::Kill, Emotion::Proud, Persona::Cheerful, Language::En),
            &["{count} kills and counting, {nickname}!"],
        ),
    ]
}

pub fn lookup(kind: EventKind, emotion: Emotion, persona: Persona, language: Language) -> Option<&'static [&'static str]> {
    table()
        .iter()
        .find(|(key, _)| *key == (kind, emotion, persona, language))
        .map(|(_, lines)| *lines)
}

/// Static `(kind, language)` neutral line — the last link of the fallback
/// chain, always present.
pub fn neutral_line(kind: EventKind, language: Language) -> &'static str {
    match (kind, language) {
        (EventKind::Victory, Language::Zh) => "{nickname}，你赢了。",
        (EventKind::Defeat, Language::Zh) => "{nickname}，这把没赢。",
        (_, Language::Zh) => "{nickname}，注意到了。",
        (EventKind::Victory, _) => "{nickname}, you won.",
        (EventKind::Defeat, _) => "{nickname}, that one didn't go your way.",
        (EventKind::Achievement, _) => "{nickname}, achievement earned.",
        (EventKind::LevelUp, _) => "{nickname}, you leveled up.",
        (EventKind::Loot, _) => "{nickname}, you picked something up.",
        (EventKind::Kill, _) => "{nickname}, enemy down.",
        (EventKind::Death, _) => "{nickname}, you went down.",
        (EventKind::CombatBossDefeated, _) => "{nickname}, boss defeated.",
        (EventKind::SessionStart, _) => "Welcome back, {nickname}.",
        (EventKind::SessionEnd, _) => "See you next time, {nickname}.",
        (EventKind::CombatStart, _) => "{nickname}, fight's on.",
    }
}
