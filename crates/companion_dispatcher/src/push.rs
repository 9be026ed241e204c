//! Hook the dispatcher calls after every response — the realtime gateway
//! implements this to fan a response out to `player/{player}` subscribers
//! with a monotonically increasing `seq`; it is decoupled from the
//! dispatcher so the dispatcher's tests never need a live socket.

use companion_core::model::CompanionResponse;

pub trait PushSink: Send + Sync {
    fn push(&self, player: &str, response: &CompanionResponse);
}

#[derive(Debug, Default)]
pub struct NoopPush;

impl PushSink for NoopPush {
    fn push(&self, _player: &str, _response: &CompanionResponse) {}
}
