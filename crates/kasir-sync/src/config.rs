//! # Sync Configuration
//!
//! Configuration management for the offline sync client.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASIR_SERVER_URL=https://pos.example.com/api/v1                    │
//! │     KASIR_AUTH_TOKEN=eyJhbGciOi...                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kasir-pos/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/com.kasir.pos/sync.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost server, 30 s poll, auto-generated device id              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Kasir 1"
//!
//! [server]
//! url = "http://192.168.1.10:3000/api/v1"
//! auth_token = "eyJhbGciOi..."
//! request_timeout_secs = 15
//!
//! [sync]
//! poll_interval_secs = 30
//! batch_size = 100
//! max_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4), generated on first run.
    #[serde(default = "generate_device_id")]
    pub id: String,

    /// Human-readable device name (e.g., "Kasir 1").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "POS Terminal".to_string()
}

fn generate_device_id() -> String {
    Uuid::new_v4().to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: generate_device_id(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Where the API lives and how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL including the `/api/v1` prefix.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Bearer token issued by the auth provider for the signed-in cashier.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:3000/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: default_server_url(),
            auth_token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between reconciliation cycles (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Queued transactions sent per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Server rejections tolerated per transaction before it becomes a
    /// dead letter.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Initial backoff between HTTP retries (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff between HTTP retries (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Give up retrying a request after this long (seconds).
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,

    /// Local queue database. Defaults to the platform data dir.
    #[serde(default)]
    pub local_db: Option<PathBuf>,
}

fn default_poll_interval() -> u64 {
    30
}
fn default_batch_size() -> usize {
    100
}
fn default_max_attempts() -> i64 {
    kasir_core::MAX_RETRY_ATTEMPTS
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    30
}
fn default_max_elapsed() -> u64 {
    60
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_elapsed_secs: default_max_elapsed(),
            local_db: None,
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::InvalidConfig("device.id must not be empty".into()));
        }

        let url = url::Url::parse(&self.server.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "Server URL must start with http:// or https://, got: {}",
                self.server.url
            )));
        }

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }
        if self.sync.max_attempts <= 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `KASIR_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("KASIR_SERVER_URL") {
            debug!(url = %url, "Overriding server URL from environment");
            self.server.url = url;
        }

        if let Some(token) = lookup("KASIR_AUTH_TOKEN") {
            self.server.auth_token = Some(token).filter(|t| !t.is_empty());
        }

        if let Some(secs) = lookup("KASIR_POLL_INTERVAL") {
            match secs.parse::<u64>() {
                Ok(s) => self.sync.poll_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid KASIR_POLL_INTERVAL"),
            }
        }

        if let Some(name) = lookup("KASIR_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Some(path) = lookup("KASIR_LOCAL_DB") {
            self.sync.local_db = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kasir", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Local queue path: configured, else `<data dir>/kasir-local.db`.
    pub fn local_db_path(&self) -> PathBuf {
        self.sync.local_db.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "kasir", "pos")
                .map(|dirs| dirs.data_dir().join("kasir-local.db"))
                .unwrap_or_else(|| PathBuf::from("./kasir-local.db"))
        })
    }
}
