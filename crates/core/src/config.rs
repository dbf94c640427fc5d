use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    pub waves: WaveConfig,
    pub wrapper: WrapperConfig,
    pub layout: LayoutConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            queue: QueueConfig::from_env(),
            waves: WaveConfig::from_env(),
            wrapper: WrapperConfig::from_env(),
            layout: LayoutConfig::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  queue:   base_concurrency={}, cap={}, boost=x{}",
            self.queue.base_concurrency,
            self.queue.max_concurrency_cap,
            self.queue.boost_multiplier
        );
        tracing::info!(
            "  waves:   deferred_delay={}ms, background_delay={}ms",
            self.waves.deferred_delay_ms,
            self.waves.background_delay_ms
        );
        tracing::info!(
            "  wrapper: important_fallback={}ms, background_delay={}ms, hover={}",
            self.wrapper.important_fallback_ms,
            self.wrapper.background_delay_ms,
            self.wrapper.hover_trigger_enabled
        );
        tracing::info!(
            "  layout:  key={}, autosave_quiet={}ms",
            self.layout.storage_key,
            self.layout.autosave_quiet_ms
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            waves: WaveConfig::default(),
            wrapper: WrapperConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

// ── Queue ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Starting concurrency limit before any adjustment.
    pub base_concurrency: usize,
    /// Hard ceiling the limit can be boosted to.
    pub max_concurrency_cap: usize,
    /// Multiplier applied when device resources are abundant.
    pub boost_multiplier: usize,
}

impl QueueConfig {
    fn from_env() -> Self {
        Self {
            base_concurrency: env_usize("STUMP_QUEUE_BASE_CONCURRENCY", 4),
            max_concurrency_cap: env_usize("STUMP_QUEUE_CONCURRENCY_CAP", 8),
            boost_multiplier: env_usize("STUMP_QUEUE_BOOST_MULTIPLIER", 2),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            base_concurrency: 4,
            max_concurrency_cap: 8,
            boost_multiplier: 2,
        }
    }
}

// ── Progressive waves ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Delay from the Important wave's start until the Deferred wave.
    pub deferred_delay_ms: u64,
    /// Delay from the Important wave's start until the Background wave.
    pub background_delay_ms: u64,
}

impl WaveConfig {
    fn from_env() -> Self {
        Self {
            deferred_delay_ms: env_u64("STUMP_WAVE_DEFERRED_DELAY_MS", 2_000),
            background_delay_ms: env_u64("STUMP_WAVE_BACKGROUND_DELAY_MS", 5_000),
        }
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            deferred_delay_ms: 2_000,
            background_delay_ms: 5_000,
        }
    }
}

// ── Loading-unit wrapper ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Important units fire unconditionally after this delay even when
    /// never observed visible.
    pub important_fallback_ms: u64,
    /// Background units trigger after this delay regardless of visibility.
    pub background_delay_ms: u64,
    /// Allow pointer-intent signals to trigger Important/Critical early.
    pub hover_trigger_enabled: bool,
}

impl WrapperConfig {
    fn from_env() -> Self {
        Self {
            important_fallback_ms: env_u64("STUMP_WRAP_IMPORTANT_FALLBACK_MS", 4_000),
            background_delay_ms: env_u64("STUMP_WRAP_BACKGROUND_DELAY_MS", 8_000),
            hover_trigger_enabled: env_bool("STUMP_WRAP_HOVER_TRIGGER", true),
        }
    }
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            important_fallback_ms: 4_000,
            background_delay_ms: 8_000,
            hover_trigger_enabled: true,
        }
    }
}

// ── Layout persistence ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Namespace key the layout snapshot is persisted under.
    pub storage_key: String,
    /// Quiet period before a debounced auto-save fires.
    pub autosave_quiet_ms: u64,
}

impl LayoutConfig {
    fn from_env() -> Self {
        Self {
            storage_key: env_or("STUMP_LAYOUT_STORAGE_KEY", "stump.dashboard.layout"),
            autosave_quiet_ms: env_u64("STUMP_LAYOUT_AUTOSAVE_QUIET_MS", 1_000),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            storage_key: "stump.dashboard.layout".to_string(),
            autosave_quiet_ms: 1_000,
        }
    }
}
