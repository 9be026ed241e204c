//! Wire-level and domain data types shared by every engine in the pipeline.
//!
//! Everything here is plain data: no component holds business logic in this
//! module. Rule predicates and scoring functions read only the well-known
//! keys exposed by `PropertyMap`, never the raw JSON map, so behavior stays
//! deterministic regardless of what extra junk a game SDK stuffs into the
//! event payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type TenantId = String;
pub type PlayerId = String;

/// Authoring style used to pick templates and shape generative prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Cheerful,
    Cool,
    Cute,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheerful => "cheerful",
            Self::Cool => "cool",
            Self::Cute => "cute",
        }
    }
}

/// Closed set of localized dialogue languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Zh,
    En,
    Ja,
    Ko,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Ko => "ko",
        }
    }
}

/// A tenant's SaaS tier, external to the core but carried on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantTier {
    Free,
    Standard,
    Pro,
    Enterprise,
}

/// Tenant facts handed to the pipeline by the boundary (tenant/API-key store).
/// The core never fetches or caches this itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub tier: TenantTier,
    pub daily_budget_usd: f64,
    #[serde(default)]
    pub force_generative_off: bool,
    #[serde(default)]
    pub language_whitelist: Vec<Language>,
}

impl TenantContext {
    pub fn language_allowed(&self, lang: Language) -> bool {
        self.language_whitelist.is_empty() || self.language_whitelist.contains(&lang)
    }
}

/// Player identity scoped to a tenant+game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub tenant: TenantId,
    pub game: String,
    pub persona: Persona,
    pub language: Language,
    pub last_event_seq: u64,
}

/// Closed enumeration of event kinds the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Victory,
    Defeat,
    Kill,
    Death,
    Achievement,
    LevelUp,
    Loot,
    SessionStart,
    SessionEnd,
    CombatStart,
    CombatBossDefeated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
            Self::Kill => "kill",
            Self::Death => "death",
            Self::Achievement => "achievement",
            Self::LevelUp => "level_up",
            Self::Loot => "loot",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::CombatStart => "combat_start",
            Self::CombatBossDefeated => "combat_boss_defeated",
        }
    }

    /// Kinds that are worth remembering on their own, independent of
    /// emotion intensity.
    pub fn is_memory_worthy(&self) -> bool {
        matches!(self, Self::Achievement)
    }
}

/// A free-form map of well-known numeric/boolean/string keys plus an opaque
/// extension map. Rule predicates and importance scoring read only the
/// typed accessors below, never `extra` directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyMap {
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl PropertyMap {
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    pub fn kill_count(&self) -> i64 {
        self.get_i64("kill_count").unwrap_or(0)
    }

    pub fn is_legendary(&self) -> bool {
        self.get_bool("is_legendary").unwrap_or(false)
    }

    pub fn mvp(&self) -> bool {
        self.get_bool("mvp").unwrap_or(false)
    }

    pub fn win_streak(&self) -> i64 {
        self.get_i64("win_streak").unwrap_or(0)
    }

    pub fn loss_streak(&self) -> i64 {
        self.get_i64("loss_streak").unwrap_or(0)
    }

    pub fn player_health(&self) -> Option<f64> {
        self.get_f64("player_health")
    }

    pub fn in_combat(&self) -> bool {
        self.get_bool("in_combat").unwrap_or(false)
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.get_str("difficulty")
    }

    pub fn rarity(&self) -> Option<&str> {
        self.get_str("rarity")
    }

    pub fn is_high_rarity(&self) -> bool {
        matches!(self.rarity(), Some("legendary") | Some("epic"))
    }

    pub fn first_time(&self) -> bool {
        self.get_bool("first_time").unwrap_or(false)
    }

    /// Keys present, sorted, for fingerprinting — values are intentionally
    /// excluded so the fingerprint stays stable across payloads that differ
    /// only in magnitude (e.g. kill_count 3 vs 15).
    pub fn normalized_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.extra.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

/// An in-game event submitted by a game SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub tenant: TenantId,
    pub game: String,
    pub player: PlayerId,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: PropertyMap,
    #[serde(default)]
    pub context: PropertyMap,
    pub client_seq: u64,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

/// Closed set of 14 emotions the Emotion Engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Excited,
    Happy,
    Proud,
    Grateful,
    Amazed,
    Determined,
    Calm,
    Neutral,
    Bored,
    Disappointed,
    Sad,
    Anxious,
    Frustrated,
    Angry,
}

impl Emotion {
    pub const ALL: [Emotion; 14] = [
        Emotion::Excited,
        Emotion::Happy,
        Emotion::Proud,
        Emotion::Grateful,
        Emotion::Amazed,
        Emotion::Determined,
        Emotion::Calm,
        Emotion::Neutral,
        Emotion::Bored,
        Emotion::Disappointed,
        Emotion::Sad,
        Emotion::Anxious,
        Emotion::Frustrated,
        Emotion::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excited => "excited",
            Self::Happy => "happy",
            Self::Proud => "proud",
            Self::Grateful => "grateful",
            Self::Amazed => "amazed",
            Self::Determined => "determined",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
            Self::Bored => "bored",
            Self::Disappointed => "disappointed",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Frustrated => "frustrated",
            Self::Angry => "angry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s.to_lowercase())
    }

    /// Emotions that bump a memory's importance score.
    pub fn boosts_importance(&self) -> bool {
        matches!(
            self,
            Self::Amazed | Self::Excited | Self::Angry | Self::Frustrated | Self::Grateful
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionMethod {
    Rule,
    Classifier,
    Cached,
}

/// Output of the Emotion Engine for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionResult {
    #[serde(rename = "type")]
    pub emotion: Emotion,
    pub intensity: f32,
    pub confidence: f32,
    pub action: String,
    pub method: EmotionMethod,
    pub reasoning: String,
    pub latency_ms: u64,
    pub cost_usd: f64,
}

impl EmotionResult {
    /// Rule-path results never cost money.
    pub fn upholds_rule_cost_invariant(&self) -> bool {
        self.method != EmotionMethod::Rule || self.cost_usd == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueMethod {
    Template,
    Generative,
    Cached,
}

/// Output of the Dialogue Engine for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueResult {
    pub text: String,
    pub language: Language,
    pub persona: Persona,
    pub method: DialogueMethod,
    pub used_special_case: bool,
    pub special_case_reasons: Vec<String>,
    pub memory_count: usize,
    pub latency_ms: u64,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl DialogueResult {
    /// Template/cached dialogue never costs money.
    pub fn upholds_cheap_cost_invariant(&self) -> bool {
        !matches!(self.method, DialogueMethod::Template | DialogueMethod::Cached)
            || self.cost_usd == 0.0
    }
}

/// Category of a stored memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Achievement,
    Milestone,
    FirstTime,
    Dramatic,
    Conversation,
    Event,
    Observation,
}

impl MemoryKind {
    /// Kinds that force memory creation regardless of emotion intensity.
    pub fn is_always_memorable(&self) -> bool {
        matches!(
            self,
            Self::Achievement | Self::Milestone | Self::FirstTime | Self::Dramatic
        )
    }

    pub fn importance_bonus(&self) -> f32 {
        if self.is_always_memorable() {
            0.2
        } else {
            0.0
        }
    }
}

/// A semantic memory record for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub tenant: TenantId,
    pub player: PlayerId,
    pub kind: MemoryKind,
    pub content: String,
    pub emotion: Option<Emotion>,
    pub importance: f32,
    pub context: PropertyMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub embedding_pending: bool,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// A short human-readable summary for prompt injection / memory_context
    /// payloads. Truncated to keep dialogue prompts small.
    pub fn summary(&self) -> String {
        if self.content.chars().count() <= 120 {
            self.content.clone()
        } else {
            self.content.chars().take(117).collect::<String>() + "..."
        }
    }
}

/// A memory record returned from a semantic search, carrying its similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub score: f32,
}

/// Stable cache key derived from the semantically identity-bearing fields of
/// a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u128);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Per-tenant, per-UTC-day paid-spend ledger.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetBucket {
    pub spent_usd: f64,
    pub denied_count: u64,
    pub generative_count: u64,
    pub classifier_count: u64,
}

/// The component that produced a cost/latency metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Dispatcher,
    Memory,
    Emotion,
    Dialogue,
    BudgetGovernor,
    ResponseCache,
    Gateway,
}

/// One observational record for the Cost & Metric Sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMetric {
    pub tenant: TenantId,
    pub game: String,
    pub player: PlayerId,
    pub component: Component,
    pub operation: String,
    pub latency_ms: u64,
    pub status_code: u16,
    pub cost_usd: f64,
    pub cache_hit: bool,
    pub timestamp: DateTime<Utc>,
}

/// Final reply shape for `POST /v1/events` and the realtime push payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionResponse {
    pub emotion: EmotionResult,
    pub dialogue: DialogueResult,
    pub memory_context: Vec<String>,
    pub latency_ms: u64,
    pub partial: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub degraded_reasons: Vec<String>,
}
