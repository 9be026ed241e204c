//! Per-player realtime sessions. One [`Session`] per live WebSocket
//! connection; the registry is the [`companion_dispatcher::PushSink`] the
//! dispatcher calls into after every response.

use crate::types::RealtimeServerMessage;
use companion_core::model::CompanionResponse;
use companion_dispatcher::PushSink;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Notify;

struct SessionQueue {
    buffer: VecDeque<RealtimeServerMessage>,
    lost_since_drain: u64,
}

pub struct Session {
    queue: Mutex<SessionQueue>,
    notify: Notify,
    capacity: usize,
    seq: AtomicU64,
    pub last_pong_at: AtomicU64,
}

impl Session {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(SessionQueue { buffer: VecDeque::new(), lost_since_drain: 0 }),
            notify: Notify::new(),
            capacity,
            seq: AtomicU64::new(0),
            last_pong_at: AtomicU64::new(0),
        })
    }

    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn enqueue(&self, message: RealtimeServerMessage) {
        let mut guard = self.queue.lock().expect("session queue lock poisoned");
        if guard.buffer.len() >= self.capacity {
            guard.buffer.pop_front();
            guard.lost_since_drain += 1;
        }
        guard.buffer.push_back(message);
        self.notify.notify_one();
    }

    /// Pulls the next message, or `None` if the buffer just drained and a
    /// loss count needs reporting before going idle again.
    pub async fn next_message(&self) -> RealtimeServerMessage {
        loop {
            // Register for notification before checking the queue, not
            // after, so a push arriving in between can't be missed.
            let notified = self.notify.notified();
            {
                let mut guard = self.queue.lock().expect("session queue lock poisoned");
                if let Some(msg) = guard.buffer.pop_front() {
                    return msg;
                }
                if guard.lost_since_drain > 0 {
                    let count = guard.lost_since_drain;
                    guard.lost_since_drain = 0;
                    return RealtimeServerMessage::LostCount { count };
                }
            }
            notified.await;
        }
    }
}

#[derive(Clone)]
pub struct PushRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    buffer_size: usize,
}

impl PushRegistry {
    pub fn new(buffer_size: usize) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), buffer_size }
    }

    pub fn register(&self, player: &str) -> Arc<Session> {
        let session = Session::new(self.buffer_size);
        self.sessions.write().expect("push registry lock poisoned").insert(player.to_string(), session.clone());
        session
    }

    pub fn unregister(&self, player: &str) {
        self.sessions.write().expect("push registry lock poisoned").remove(player);
    }
}

impl PushSink for PushRegistry {
    fn push(&self, player: &str, response: &CompanionResponse) {
        let session = {
            let guard = self.sessions.read().expect("push registry lock poisoned");
            guard.get(player).cloned()
        };
        let Some(session) = session else {
            return;
        };
        let seq = session.next_seq();
        session.enqueue(RealtimeServerMessage::Reaction {
            seq,
            response: Box::new(response.clone()),
            event_ref: None,
            ts: chrono::Utc::now(),
        });
    }
}
