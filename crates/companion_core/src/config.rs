use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub dispatcher: DispatcherConfig,
    pub budget: BudgetConfig,
    pub cache: CacheConfig,
    pub memory: MemoryConfig,
    pub push: PushConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl CompanionConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: CompanionConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("COMPANION_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Ok(v) = std::env::var("COMPANION_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("COMPANION_PORT") {
            if let Ok(p) = v.parse() {
                self.server.port = p;
            }
        }
        if let Ok(v) = std::env::var("BUDGET_DAILY_USD_DEFAULT") {
            if let Ok(n) = v.parse() {
                self.budget.daily_usd_default = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub deadline_ms: u64,
    pub memory_deadline_ms: u64,
    pub emotion_deadline_ms: u64,
    pub workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 2000,
            memory_deadline_ms: 600,
            emotion_deadline_ms: 800,
            workers: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub daily_usd_default: f64,
    pub generative_share_target: f32,
    pub classifier_share_target: f32,
    /// Fraction of the daily ceiling at which only high-value paid calls admit.
    pub high_value_threshold_pct: f32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_usd_default: 15.0,
            generative_share_target: 0.10,
            classifier_share_target: 0.15,
            high_value_threshold_pct: 0.80,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub lru_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            lru_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub importance_floor: f32,
    pub cleanup_min_importance: f32,
    pub context_k: usize,
    pub soft_cap: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            importance_floor: 0.3,
            cleanup_min_importance: 0.3,
            context_k: 5,
            soft_cap: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub buffer_size: usize,
    pub heartbeat_seconds: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            heartbeat_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "claude-4-5-haiku-20250929".to_string(),
            base_url: None,
            max_tokens: 256,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "companion.db".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
