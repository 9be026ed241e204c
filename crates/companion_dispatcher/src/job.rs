//! Per-player worker queues. Hashing a player id to a fixed worker keeps all
//! work for that player on one task, so a worker can hold player-scoped
//! state (the push sequence counter) without a lock.

use companion_core::model::{CompanionResponse, GameEvent, Language, Persona, TenantContext};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::oneshot;

pub struct Job {
    pub event: GameEvent,
    pub tenant: TenantContext,
    pub persona: Persona,
    pub language: Language,
    pub reply: Option<oneshot::Sender<anyhow::Result<CompanionResponse>>>,
}

pub fn worker_index(player: &str, worker_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    player.hash(&mut hasher);
    (hasher.finish() as usize) % worker_count.max(1)
}
