use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

/// Process configuration read from the environment.
///
/// The schedule itself (shift tables, rotation, weekend window) lives in a
/// YAML file loaded by `oncall-schedule`; this only says where to find it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub schedule: ScheduleSourceConfig,
    pub ping: PingConfig,
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ONCALL_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ONCALL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            schedule: ScheduleSourceConfig::from_env_profiled(p),
            ping: PingConfig::from_env_profiled(p),
            delivery: DeliveryConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  storage:   state_file={}", self.storage.state_file().display());
        tracing::info!(
            "  schedule:  path={}",
            self.schedule
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        );
        tracing::info!(
            "  ping:      tick={}s, budget={}ms, delivery_timeout={}s",
            self.ping.tick_interval_secs,
            self.ping.tick_budget_ms,
            self.ping.delivery_timeout_secs
        );
        tracing::info!("  delivery:  webhook={}", self.delivery.is_configured());
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "storage": {
                "data_dir": self.storage.data_dir,
                "state_file": self.storage.state_file(),
            },
            "schedule": { "path": self.schedule.path },
            "ping": {
                "tick_interval_secs": self.ping.tick_interval_secs,
                "tick_budget_ms": self.ping.tick_budget_ms,
                "delivery_timeout_secs": self.ping.delivery_timeout_secs,
            },
            "delivery": {
                "webhook_configured": self.delivery.is_configured(),
                "has_token": self.delivery.webhook_token.is_some(),
            },
        })
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file_name: String,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            state_file_name: profiled_env_or(p, "STATE_FILE", "oncall-state.json"),
        }
    }

    /// Full path of the roster/cursor/settings document.
    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join(&self.state_file_name)
    }
}

// ── Schedule source ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSourceConfig {
    /// YAML schedule file. `None` selects the built-in reference schedule.
    pub path: Option<PathBuf>,
}

impl ScheduleSourceConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            path: profiled_env_opt(p, "SCHEDULE_FILE").map(PathBuf::from),
        }
    }
}

// ── Ping engine ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingConfig {
    pub tick_interval_secs: u64,
    /// Soft budget per tick; exceeding it only logs a warning.
    pub tick_budget_ms: u64,
    pub delivery_timeout_secs: u64,
}

impl PingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            tick_interval_secs: profiled_env_u64(p, "TICK_INTERVAL_SECS", 60).max(1),
            tick_budget_ms: profiled_env_u64(p, "TICK_BUDGET_MS", 1_000),
            delivery_timeout_secs: profiled_env_u64(p, "DELIVERY_TIMEOUT_SECS", 10).max(1),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            tick_budget_ms: 1_000,
            delivery_timeout_secs: 10,
        }
    }
}

// ── Delivery ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Webhook endpoint that performs the actual chat-platform send.
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
}

impl DeliveryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "WEBHOOK_URL"),
            webhook_token: profiled_env_opt(p, "WEBHOOK_TOKEN"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}
