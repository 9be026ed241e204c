use clap::Parser;
use companion_budget::{BudgetGovernor, CostSink, ResponseCache, SharedStore};
use companion_core::config::CompanionConfig;
use companion_core::model::{TenantContext, TenantTier};
use companion_dialogue::DialogueEngine;
use companion_dispatcher::Dispatcher;
use companion_emotion::EmotionEngine;
use companion_gateway::{AppState, InMemoryTenantDirectory, PushRegistry};
use companion_memory::{MemoryEngine, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Serve the Companion Response Pipeline: REST ingress, realtime push, and
/// the background dispatcher that turns events into companion replies.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to TOML config file.
    #[arg(short, long, default_value = "companion.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seed a single tenant for local development (format: api_key:tenant_id:daily_budget_usd).
    #[arg(long, env = "COMPANION_DEV_TENANT")]
    dev_tenant: Option<String>,
}

const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let config = CompanionConfig::load_or_default(&args.config);
    tracing::info!(provider = %config.llm.provider, model = %config.llm.model, "loaded companion config");

    let memory_store = MemoryStore::open(&config.storage.db_path).await?;
    let shared_store = SharedStore::open(&config.storage.db_path).await?;

    let budget = Arc::new(BudgetGovernor::new(shared_store.clone(), config.budget.clone()));
    let cache = Arc::new(ResponseCache::new(shared_store.clone(), config.cache.lru_size, config.cache.ttl_seconds));
    let sink = CostSink::spawn(shared_store.clone());

    let classifier = companion_llm::build_classifier(&config.llm);
    let generative = companion_llm::build_generative(&config.llm);

    let memory = Arc::new(MemoryEngine::new(memory_store, config.memory.clone()));
    let emotion = Arc::new(EmotionEngine::new(classifier, budget.clone(), config.llm.model.clone()));
    let dialogue = Arc::new(DialogueEngine::new(generative, budget, config.llm.model.clone()));

    let push_registry = PushRegistry::new(config.push.buffer_size);
    let dispatcher = Arc::new(Dispatcher::new(
        memory.clone(),
        emotion,
        dialogue,
        cache,
        sink,
        Arc::new(push_registry.clone()),
        config.dispatcher.clone(),
        config.memory.context_k,
    ));

    spawn_memory_maintenance(memory);

    let tenants: Arc<InMemoryTenantDirectory> = Arc::new(InMemoryTenantDirectory::new());
    if let Some(spec) = args.dev_tenant.as_deref() {
        seed_dev_tenant(&tenants, spec);
    }

    let state = AppState {
        dispatcher: dispatcher.clone(),
        tenants,
        push_registry,
        store: shared_store,
        heartbeat_seconds: config.push.heartbeat_seconds,
    };

    let app = companion_gateway::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "companion gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain(&dispatcher).await;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler, shutting down immediately");
        return;
    }
    tracing::info!("shutdown signal received, draining in-flight work");
}

async fn drain(dispatcher: &Dispatcher) {
    let deadline = tokio::time::Instant::now() + SHUTDOWN_DRAIN_TIMEOUT;
    while dispatcher.in_flight_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let remaining = dispatcher.in_flight_count();
    if remaining > 0 {
        tracing::warn!(remaining, "shutdown drain timed out with jobs still in flight");
    } else {
        tracing::info!("dispatcher drained cleanly");
    }
}

fn spawn_memory_maintenance(memory: Arc<MemoryEngine>) {
    tokio::spawn(async move {
        let mut decay_interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        let mut embedding_interval = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            tokio::select! {
                _ = decay_interval.tick() => {
                    match memory.decay_tick().await {
                        Ok(n) => tracing::debug!(updated = n, "memory decay tick completed"),
                        Err(e) => tracing::warn!("memory decay tick failed: {}", e),
                    }
                }
                _ = embedding_interval.tick() => {
                    match memory.retry_pending_embeddings(200).await {
                        Ok(n) if n > 0 => tracing::info!(backfilled = n, "retried pending embeddings"),
                        Ok(_) => {}
                        Err(e) => tracing::warn!("retrying pending embeddings failed: {}", e),
                    }
                }
            }
        }
    });
}

fn seed_dev_tenant(tenants: &InMemoryTenantDirectory, spec: &str) {
    let mut parts = spec.splitn(3, ':');
    let (Some(api_key), Some(tenant_id), Some(budget_str)) = (parts.next(), parts.next(), parts.next()) else {
        tracing::warn!("COMPANION_DEV_TENANT must be api_key:tenant_id:daily_budget_usd, ignoring");
        return;
    };
    let daily_budget_usd = budget_str.parse().unwrap_or(15.0);
    tenants.insert(
        api_key,
        TenantContext {
            tenant_id: tenant_id.to_string(),
            tier: TenantTier::Standard,
            daily_budget_usd,
            force_generative_off: false,
            language_whitelist: vec![],
        },
        true,
    );
    tracing::info!(tenant_id, "seeded development tenant");
}
