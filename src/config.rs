// src/config.rs
// Monitor descriptors. JSON is the primary format, TOML accepted by
// extension. The `type` tag selects the target variant, so a forum
// descriptor cannot carry a thread URL and vice versa.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitors.json";

pub const ENV_USERNAME: &str = "FORUM_USERNAME";
pub const ENV_PASSWORD: &str = "FORUM_PASSWORD";

const DEFAULT_WEBHOOK_ENV: &str = "DISCORD_WEBHOOK_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorsConfig {
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Base forum URL used for authentication.
    pub forum_url: String,
    /// Environment variable holding the webhook URL for this monitor.
    #[serde(default = "default_webhook_env")]
    pub webhook_env: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub target: MonitorTarget,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MonitorTarget {
    /// Watch a forum section for new threads.
    Forum { section_url: String },
    /// Watch a single thread for new replies.
    Thread { thread_url: String },
}

fn default_name() -> String {
    "Monitor".to_string()
}

fn default_webhook_env() -> String {
    DEFAULT_WEBHOOK_ENV.to_string()
}

fn default_enabled() -> bool {
    true
}

impl MonitorsConfig {
    /// Load descriptors, parsing each one individually: a broken descriptor
    /// is logged and skipped so the other monitors still run. Only a file
    /// with no usable monitors at all is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let raw: serde_json::Value = if ext == "toml" {
            let v: toml::Value = toml::from_str(&content)
                .with_context(|| format!("parsing TOML config {}", path.display()))?;
            serde_json::to_value(v)
                .with_context(|| format!("converting TOML config {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing JSON config {}", path.display()))?
        };

        let entries = raw
            .get("monitors")
            .and_then(|m| m.as_array())
            .cloned()
            .ok_or_else(|| anyhow!("config {} has no monitors array", path.display()))?;

        let mut monitors = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("<no id>")
                .to_string();
            match serde_json::from_value::<MonitorConfig>(entry) {
                Ok(m) => monitors.push(m),
                Err(e) => {
                    tracing::error!(monitor = %id, error = %e, "invalid monitor descriptor, skipping");
                }
            }
        }

        if monitors.is_empty() {
            return Err(anyhow!("config {} declares no usable monitors", path.display()));
        }
        Ok(Self { monitors })
    }

    /// Load from `$MONITOR_CONFIG_PATH`, falling back to `config/monitors.json`.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn enabled_monitors(&self) -> impl Iterator<Item = &MonitorConfig> {
        self.monitors.iter().filter(|m| m.enabled)
    }
}

/// Forum credentials. Missing values are the one fatal initialization
/// error: without them no monitor can run at all.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let username = std::env::var(ENV_USERNAME)
            .map_err(|_| anyhow!("{ENV_USERNAME} environment variable must be set"))?;
        let password = std::env::var(ENV_PASSWORD)
            .map_err(|_| anyhow!("{ENV_PASSWORD} environment variable must be set"))?;
        Ok(Self { username, password })
    }
}
