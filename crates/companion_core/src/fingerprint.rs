//! Response fingerprint: the cache key shared by Response Cache, Budget
//! Governor high-value checks, and the weighted-random template seed.
//!
//! Persona and language are part of the hash to avoid collisions, and
//! template selection must be deterministic given the same fingerprint
//! seed — so this is the one hash used everywhere identity needs to be
//! stable across process restarts.

use crate::model::{Emotion, EventKind, Fingerprint, Language, Persona, PropertyMap};
use sha2::{Digest, Sha256};

/// Compute the cache-key fingerprint for a request.
///
/// Only normalized (sorted) payload/context *keys* go into the hash, never
/// values — two events with the same shape but different magnitudes (e.g.
/// `kill_count: 3` vs `kill_count: 15`) must fingerprint identically, since
/// the response they'd produce is the same template with different
/// substituted numbers.
pub fn compute(
    tenant: &str,
    game: &str,
    player_persona: Persona,
    language: Language,
    kind: EventKind,
    payload: &PropertyMap,
    context: &PropertyMap,
    emotion_if_known: Option<Emotion>,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(tenant.as_bytes());
    hasher.update(b"\0");
    hasher.update(game.as_bytes());
    hasher.update(b"\0");
    hasher.update(player_persona.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(language.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\0");
    for key in payload.normalized_keys() {
        hasher.update(key.as_bytes());
        hasher.update(b",");
    }
    hasher.update(b"\0");
    for key in context.normalized_keys() {
        hasher.update(key.as_bytes());
        hasher.update(b",");
    }
    hasher.update(b"\0");
    hasher.update(emotion_if_known.map(|e| e.as_str()).unwrap_or("").as_bytes());

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[0..16]);
    Fingerprint(u128::from_be_bytes(bytes))
}

/// Derive a deterministic `u64` seed from a fingerprint for weighted-random
/// template selection, keeping selection stable for identical requests.
pub fn seed_from(fingerprint: Fingerprint) -> u64 {
    (fingerprint.0 as u64) ^ ((fingerprint.0 >> 64) as u64)
}
