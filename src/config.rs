//! Terminal configuration.
//!
//! Loaded once at startup from an optional JSON file and then overridden by
//! environment variables. The resulting [`AppConfig`] is the single declared
//! source for the backend base URL, retry policy, token storage backend and
//! the order status table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable pointing at the JSON config file.
pub const CONFIG_ENV_VAR: &str = "TICKET_TERMINAL_CONFIG";
/// Environment variable overriding the backend base URL.
pub const API_BASE_ENV_VAR: &str = "TICKET_TERMINAL_API_BASE";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV_VAR: &str = "TICKET_TERMINAL_DATA_DIR";
/// Environment variable overriding the request timeout (seconds).
pub const TIMEOUT_ENV_VAR: &str = "TICKET_TERMINAL_TIMEOUT_SECS";
/// Environment variable selecting the token store (`keyring` or `local`).
pub const TOKEN_STORE_ENV_VAR: &str = "TICKET_TERMINAL_TOKEN_STORE";

/// Config file name looked up inside the data directory.
pub const DEFAULT_CONFIG_FILE: &str = "terminal-config.json";

const DEFAULT_API_BASE: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_RETENTION_FILES: usize = 10;

/// Where the Basic auth token is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// OS credential store.
    #[default]
    Keyring,
    /// `local_settings` table of the terminal database.
    Local,
}

impl TokenStoreKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keyring" => Some(Self::Keyring),
            "local" | "sqlite" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Bounded retry policy applied by the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the given retry (1-based), doubling per attempt and
    /// capped at `max_delay_ms`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
    pub token_store: TokenStoreKind,
    /// Backend status code -> label. Keys are decimal codes.
    pub order_status_labels: BTreeMap<String, String>,
    pub log_retention_files: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            data_dir: default_data_dir(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            token_store: TokenStoreKind::default(),
            order_status_labels: BTreeMap::new(),
            log_retention_files: DEFAULT_LOG_RETENTION_FILES,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_base.trim().is_empty() {
            return Err("api_base must not be empty".into());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".into());
        }
        for code in self.order_status_labels.keys() {
            if code.trim().parse::<i32>().is_err() {
                return Err(format!("order_status_labels key is not a status code: {code}"));
            }
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".ticket-terminal")
}

/// Normalise the backend base URL:
/// - ensure a scheme is present (http for localhost, https otherwise)
/// - strip trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

fn read_config_file(path: &Path) -> Result<Option<AppConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("read config {}: {e}", path.display()))?;
    let parsed = serde_json::from_str::<AppConfig>(&raw)
        .map_err(|e| format!("parse config {}: {e}", path.display()))?;
    Ok(Some(parsed))
}

/// Load configuration: file (if any) first, environment second.
pub fn load() -> Result<AppConfig, String> {
    let env_data_dir = std::env::var(DATA_DIR_ENV_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let config_path = std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            env_data_dir
                .clone()
                .unwrap_or_else(default_data_dir)
                .join(DEFAULT_CONFIG_FILE)
        });

    let mut config = match read_config_file(&config_path)? {
        Some(c) => {
            info!(path = %config_path.display(), "loaded terminal config file");
            c
        }
        None => AppConfig::default(),
    };

    if let Some(dir) = env_data_dir {
        config.data_dir = dir;
    }
    if let Ok(base) = std::env::var(API_BASE_ENV_VAR) {
        if !base.trim().is_empty() {
            config.api_base = base;
        }
    }
    if let Ok(raw) = std::env::var(TIMEOUT_ENV_VAR) {
        match raw.trim().parse::<u64>() {
            Ok(secs) => config.request_timeout_secs = secs,
            Err(_) => warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV_VAR}"),
        }
    }
    if let Ok(raw) = std::env::var(TOKEN_STORE_ENV_VAR) {
        match TokenStoreKind::parse(&raw) {
            Some(kind) => config.token_store = kind,
            None => warn!(value = %raw, "ignoring invalid {TOKEN_STORE_ENV_VAR}"),
        }
    }

    config.api_base = normalize_base_url(&config.api_base);
    config.validate()?;
    Ok(config)
}
