//! Settings – reads the optional `~/.nao/config.toml`.
//!
//! The file is never written by the program. Missing file means defaults;
//! environment variables override whatever the file says.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings for the `nao` binary.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the OpenAI-compatible API.
    pub api_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Key for completions and embeddings. Without one the assistant cannot
    /// plan, and memories use the offline hash embedder.
    pub openai_api_key: String,
    /// Key for Serper web search. Without one web search is disabled.
    pub serper_api_key: String,
    /// SQLite file for long-term memory; in-memory when unset.
    pub memory_path: Option<PathBuf>,
    /// Pause after each executed gesture; `0` disables pacing.
    pub step_delay_ms: u64,
    /// Per-request HTTP timeout; `0` is rejected in favour of the default.
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("memory_path", &self.memory_path)
            .field("step_delay_ms", &self.step_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() { "<not set>" } else { "<redacted>" }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-3.5-turbo-16k".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            openai_api_key: String::new(),
            serper_api_key: String::new(),
            memory_path: None,
            step_delay_ms: 1000,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl Config {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Return the path to `~/.nao/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".nao").join("config.toml")
}

/// Load settings from the default path and the process environment.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Load the file at `path`. Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    if cfg.request_timeout_secs == 0 {
        cfg.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
    }
    Ok(Some(cfg))
}

/// Apply overrides looked up through `var`.
///
/// | Variable | Config field |
/// |---|---|
/// | `NAO_API_BASE` | `api_base_url` |
/// | `NAO_MODEL` | `chat_model` |
/// | `NAO_EMBEDDING_MODEL` | `embedding_model` |
/// | `OPENAI_API_KEY` | `openai_api_key` |
/// | `SERPER_API_KEY` | `serper_api_key` |
/// | `NAO_MEMORY_PATH` | `memory_path` |
/// | `NAO_STEP_DELAY_MS` | `step_delay_ms` |
/// | `NAO_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
///
/// Numeric values that do not parse are ignored, as is a zero timeout.
pub fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("NAO_API_BASE") {
        cfg.api_base_url = v;
    }
    if let Some(v) = var("NAO_MODEL") {
        cfg.chat_model = v;
    }
    if let Some(v) = var("NAO_EMBEDDING_MODEL") {
        cfg.embedding_model = v;
    }
    if let Some(v) = var("OPENAI_API_KEY") {
        cfg.openai_api_key = v;
    }
    if let Some(v) = var("SERPER_API_KEY") {
        cfg.serper_api_key = v;
    }
    if let Some(v) = var("NAO_MEMORY_PATH")
        && !v.trim().is_empty()
    {
        cfg.memory_path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("NAO_STEP_DELAY_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.step_delay_ms = ms;
    }
    if let Some(v) = var("NAO_REQUEST_TIMEOUT_SECS")
        && let Ok(secs) = v.trim().parse::<u64>()
        && secs > 0
    {
        cfg.request_timeout_secs = secs;
    }
}
