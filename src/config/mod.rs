//! Configuration module for patchbay-rs
//!
//! This module handles application configuration including:
//! - Server address and transport timing (debounce, reconnect delay)
//! - Editor tuning (zoom step, hit tolerances, layout policy)
//! - Logging filter and optional log file
//!
//! # Config Location
//!
//! The configuration file is stored in the platform-appropriate location:
//! - **Linux**: `~/.config/dev.patchbay-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.patchbay-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.patchbay-rs\config.toml`
//!
//! Every field has a serde default, so a partial file (or none at all) loads.
//! `PATCHBAY_HOST` / `PATCHBAY_PORT` override the server address.
//!
//! # Example
//!
//! ```ignore
//! use patchbay_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.server.port = 9000;
//! config.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{PatchbayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.patchbay-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default server port (matches the server's default listen address)
pub const DEFAULT_SERVER_PORT: u16 = 8449;

/// Default delay between a change notification and the snapshot re-fetch
pub const DEFAULT_REFRESH_DEBOUNCE_MS: u64 = 100;

/// Default fixed delay before reconnecting a lost event feed
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Default timeout for REST requests
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2000;

// ==================== Directories ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the application data directory path (log files)
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Which transport backs the editor
    #[serde(default)]
    pub transport: TransportMode,

    /// Server connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Editor behaviour
    #[serde(default)]
    pub editor: EditorSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// UI preferences
    #[serde(default)]
    pub ui: UiPreferences,
}

impl AppConfig {
    /// Load config from the default location, with environment overrides
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            PatchbayError::Config("Could not determine config path".to_string())
        })?;

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Load config from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PatchbayError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            PatchbayError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = config_path().ok_or_else(|| {
            PatchbayError::Config("Could not determine config path".to_string())
        })?;
        self.save_to(path)
    }

    /// Save config to an explicit path, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PatchbayError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PatchbayError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PatchbayError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PATCHBAY_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("PATCHBAY_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PATCHBAY_PORT {:?}", port),
            }
        }
    }
}

// ==================== Server Config ====================

/// Address of the patchbay server and transport timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Server host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debounce between a change notification and the snapshot re-fetch
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,

    /// Fixed delay before reconnecting a lost event feed
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Timeout for REST requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_refresh_debounce_ms() -> u64 {
    DEFAULT_REFRESH_DEBOUNCE_MS
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_SERVER_PORT,
            refresh_debounce_ms: DEFAULT_REFRESH_DEBOUNCE_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Base URL for REST requests, e.g. `http://127.0.0.1:8449`
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// URL of the event feed, e.g. `ws://127.0.0.1:8449/ws`
    pub fn events_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ==================== Transport Mode ====================

/// Which transport implementation backs the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransportMode {
    /// Talk to a patchbay server over HTTP + WebSocket
    #[default]
    Http,
    /// In-process demo graph, no server required
    Demo,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Http => write!(f, "HTTP"),
            TransportMode::Demo => write!(f, "Demo"),
        }
    }
}

// ==================== Logging Config ====================

/// Logging output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Also write logs to a daily rolling file
    #[serde(default)]
    pub log_to_file: bool,

    /// Directory for log files (defaults to `<data_dir>/logs`)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "info,patchbay_rs=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            log_to_file: false,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Resolved log directory, if file logging can be used at all
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .or_else(|| app_data_dir().map(|p| p.join("logs")))
    }
}

// ==================== Tests ====================
