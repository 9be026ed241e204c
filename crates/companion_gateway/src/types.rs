//! Wire shapes for the ingress API and realtime channel. These are kept
//! separate from `companion_core::model` so the core's domain types never
//! have to grow `#[serde(rename)]` noise to satisfy an external contract.

use companion_core::model::{CompanionResponse, EventKind, Language, Persona, PropertyMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct IngressEvent {
    pub player_id: String,
    #[serde(default = "default_game")]
    pub game: String,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: PropertyMap,
    #[serde(default)]
    pub context: PropertyMap,
    pub persona: Option<Persona>,
    pub language: Option<Language>,
    pub client_seq: Option<u64>,
}

fn default_game() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum RealtimeServerMessage {
    #[serde(rename = "companion.reaction")]
    Reaction {
        seq: u64,
        #[serde(flatten)]
        response: Box<CompanionResponse>,
        event_ref: Option<u64>,
        ts: chrono::DateTime<chrono::Utc>,
    },
    #[serde(rename = "lost_count")]
    LostCount { count: u64 },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeClientMessage {
    Event(IngressEvent),
    Ack { seq: u64 },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub components: serde_json::Value,
}
