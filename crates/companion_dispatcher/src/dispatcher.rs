//! Dispatcher: the pipeline orchestrator. One event in, one
//! `CompanionResponse` out — cache check, parallel memory/emotion fetch,
//! dialogue generation, a non-blocking memory append, a cache write, a push
//! emission, and a cost metric, all behind a wall-clock deadline.

use crate::job::{worker_index, Job};
use crate::push::PushSink;
use companion_budget::{CostSink, ResponseCache};
use companion_core::config::DispatcherConfig;
use companion_core::error::PipelineError;
use companion_core::fingerprint;
use companion_core::model::{
    CompanionResponse, Component, CostMetric, DialogueMethod, EmotionMethod, GameEvent,
    Language, MemoryKind, Persona, TenantContext,
};
use companion_dialogue::DialogueEngine;
use companion_emotion::EmotionEngine;
use companion_memory::engine::MemoryEngine;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

struct Inner {
    memory: Arc<MemoryEngine>,
    emotion: Arc<EmotionEngine>,
    dialogue: Arc<DialogueEngine>,
    cache: Arc<ResponseCache>,
    sink: CostSink,
    push: Arc<dyn PushSink>,
    config: DispatcherConfig,
    context_k: usize,
    in_flight: AtomicUsize,
}

pub struct Dispatcher {
    inner: Arc<Inner>,
    workers: Vec<mpsc::Sender<Job>>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memory: Arc<MemoryEngine>,
        emotion: Arc<EmotionEngine>,
        dialogue: Arc<DialogueEngine>,
        cache: Arc<ResponseCache>,
        sink: CostSink,
        push: Arc<dyn PushSink>,
        config: DispatcherConfig,
        context_k: usize,
    ) -> Self {
        let inner = Arc::new(Inner {
            memory,
            emotion,
            dialogue,
            cache,
            sink,
            push,
            config,
            context_k,
            in_flight: AtomicUsize::new(0),
        });
        let workers = (0..inner.config.workers.max(1))
            .map(|_| spawn_worker(inner.clone()))
            .collect();
        Self { inner, workers }
    }

    /// Number of jobs a worker has accepted but not yet replied to. Used by
    /// the service entrypoint to decide when a graceful shutdown can stop
    /// waiting and exit.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Submit an event and wait for its response, honoring the dispatcher's
    /// wall-clock deadline.
    pub async fn handle(
        &self,
        event: GameEvent,
        tenant: TenantContext,
        persona: Persona,
        language: Language,
    ) -> anyhow::Result<CompanionResponse> {
        validate(&event, &tenant)?;

        let idx = worker_index(&event.player, self.workers.len());
        let (tx, rx) = oneshot::channel();
        let job = Job { event, tenant, persona, language, reply: Some(tx) };
        self.workers[idx]
            .send(job)
            .await
            .map_err(|_| PipelineError::DependencyUnavailable {
                component: "dispatcher".into(),
                reason: "worker queue closed".into(),
            })?;

        match tokio::time::timeout(Duration::from_millis(self.inner.config.deadline_ms), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PipelineError::InternalInvariantViolation("worker dropped reply channel".into()).into()),
            Err(_) => Err(PipelineError::DependencyTimeout { component: "dispatcher".into(), elapsed_ms: self.inner.config.deadline_ms }.into()),
        }
    }

    /// Submit an event without waiting for a response; the result only
    /// reaches the caller via the push channel.
    pub async fn handle_async(
        &self,
        event: GameEvent,
        tenant: TenantContext,
        persona: Persona,
        language: Language,
    ) -> anyhow::Result<()> {
        validate(&event, &tenant)?;
        let idx = worker_index(&event.player, self.workers.len());
        let job = Job { event, tenant, persona, language, reply: None };
        self.workers[idx]
            .send(job)
            .await
            .map_err(|_| PipelineError::DependencyUnavailable {
                component: "dispatcher".into(),
                reason: "worker queue closed".into(),
            })?;
        Ok(())
    }
}

fn validate(event: &GameEvent, tenant: &TenantContext) -> Result<(), PipelineError> {
    if event.tenant.is_empty() || event.game.is_empty() || event.player.is_empty() {
        return Err(PipelineError::InvalidEvent("tenant, game and player must be non-empty".into()));
    }
    if event.tenant != tenant.tenant_id {
        return Err(PipelineError::InvalidEvent("event tenant does not match authenticated tenant".into()));
    }
    Ok(())
}

fn spawn_worker(inner: Arc<Inner>) -> mpsc::Sender<Job> {
    let (tx, mut rx) = mpsc::channel::<Job>(256);
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let reply = job.reply;
            inner.in_flight.fetch_add(1, Ordering::SeqCst);
            let result = process(&inner, job.event, job.tenant, job.persona, job.language).await;
            inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
        }
    });
    tx
}

async fn process(
    inner: &Inner,
    event: GameEvent,
    tenant: TenantContext,
    persona: Persona,
    language: Language,
) -> anyhow::Result<CompanionResponse> {
    let start = Instant::now();

    let fp = fingerprint::compute(&event.tenant, &event.game, persona, language, event.kind, &event.payload, &event.context, None);
    if let Some(mut cached) = inner.cache.get(fp).await {
        cached.emotion.method = EmotionMethod::Cached;
        cached.dialogue.method = DialogueMethod::Cached;
        cached.latency_ms = start.elapsed().as_millis() as u64;
        record_metric(inner, &event, Component::Dispatcher, "handle", start, 0.0, true);
        inner.push.push(&event.player, &cached);
        return Ok(cached);
    }

    let mut degraded_reasons = Vec::new();

    let memory_fut = tokio::time::timeout(
        Duration::from_millis(inner.config.memory_deadline_ms),
        inner.memory.get_context(&event.tenant, &event.player, &event, inner.context_k),
    );
    let emotion_fut = tokio::time::timeout(
        Duration::from_millis(inner.config.emotion_deadline_ms),
        inner.emotion.analyze(&event, "", &tenant, false),
    );
    let (memory_res, emotion_res) = tokio::join!(memory_fut, emotion_fut);

    let memory_summaries: Vec<String> = match memory_res {
        Ok(Ok(ctx)) => {
            if ctx.degraded {
                degraded_reasons.push("memory_degraded".to_string());
            }
            ctx.records.iter().map(|r| r.summary()).collect()
        }
        Ok(Err(e)) => {
            tracing::warn!("memory context fetch failed: {}", e);
            degraded_reasons.push("memory_unavailable".to_string());
            Vec::new()
        }
        Err(_) => {
            degraded_reasons.push("memory_timeout".to_string());
            Vec::new()
        }
    };

    let emotion = match emotion_res {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!("emotion analysis failed: {}", e);
            degraded_reasons.push("emotion_unavailable".to_string());
            neutral_emotion_fallback()
        }
        Err(_) => {
            degraded_reasons.push("emotion_timeout".to_string());
            neutral_emotion_fallback()
        }
    };

    let seed = fingerprint::seed_from(fp);
    let dialogue = match inner
        .dialogue
        .generate(&event, emotion.emotion, persona, language, &memory_summaries, &tenant, seed, false)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("dialogue generation failed: {}", e);
            degraded_reasons.push("dialogue_unavailable".to_string());
            neutral_dialogue_fallback(persona, language)
        }
    };

    if emotion.intensity >= 0.7 || event.kind.is_memory_worthy() {
        let memory = inner.memory.clone();
        let tenant_id = event.tenant.clone();
        let player = event.player.clone();
        let kind = memory_kind_for(&event, emotion.intensity);
        let content = dialogue.text.clone();
        let emotion_tag = Some(emotion.emotion);
        let payload = event.payload.clone();
        let context = event.context.clone();
        tokio::spawn(async move {
            if let Err(e) = memory.append(&tenant_id, &player, kind, content, emotion_tag, payload, context).await {
                tracing::warn!("non-blocking memory append failed: {}", e);
            }
        });
    }

    let total_cost = emotion.cost_usd + dialogue.cost_usd;
    let response = CompanionResponse {
        emotion,
        dialogue,
        memory_context: memory_summaries,
        latency_ms: start.elapsed().as_millis() as u64,
        partial: !degraded_reasons.is_empty(),
        degraded_reasons,
    };

    inner.cache.put(fp, response.clone(), inner.cache.default_ttl()).await;
    inner.push.push(&event.player, &response);
    record_metric(inner, &event, Component::Dispatcher, "handle", start, total_cost, false);

    Ok(response)
}

fn memory_kind_for(event: &GameEvent, intensity: f32) -> MemoryKind {
    if event.context.first_time() {
        MemoryKind::FirstTime
    } else if event.kind.is_memory_worthy() {
        MemoryKind::Achievement
    } else if event.payload.win_streak() >= 5 || event.payload.loss_streak() >= 5 {
        MemoryKind::Milestone
    } else if intensity >= 0.85 {
        MemoryKind::Dramatic
    } else {
        MemoryKind::Event
    }
}

fn neutral_emotion_fallback() -> companion_core::model::EmotionResult {
    companion_core::model::EmotionResult {
        emotion: companion_core::model::Emotion::Neutral,
        intensity: 0.3,
        confidence: 0.3,
        action: "idle".into(),
        method: EmotionMethod::Rule,
        reasoning: "emotion engine unavailable, abstaining".into(),
        latency_ms: 0,
        cost_usd: 0.0,
    }
}

fn neutral_dialogue_fallback(persona: Persona, language: Language) -> companion_core::model::DialogueResult {
    companion_core::model::DialogueResult {
        text: "...".into(),
        language,
        persona,
        method: DialogueMethod::Template,
        used_special_case: false,
        special_case_reasons: Vec::new(),
        memory_count: 0,
        latency_ms: 0,
        cost_usd: 0.0,
        fallback_reason: Some("dialogue_unavailable".into()),
    }
}

fn record_metric(inner: &Inner, event: &GameEvent, component: Component, operation: &str, start: Instant, cost_usd: f64, cache_hit: bool) {
    inner.sink.record(CostMetric {
        tenant: event.tenant.clone(),
        game: event.game.clone(),
        player: event.player.clone(),
        component,
        operation: operation.to_string(),
        latency_ms: start.elapsed().as_millis() as u64,
        status_code: 200,
        cost_usd,
        cache_hit,
        timestamp: Utc::now(),
    });
}
