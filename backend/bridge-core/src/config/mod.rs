use crate::DEFAULT_IPC_PORT;
use crate::error::config::ConfigError;
use crate::page::client::PageSettings;
use crate::rpc::client::RpcClientConfig;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;
const CONFIG_DIR_NAME: &str = "wallet-bridge";
const MAX_FAST_PROBE_ATTEMPTS: u32 = 100;

pub const ENV_IPC_PORT: &str = "WALLET_BRIDGE_PORT";
pub const ENV_AUTH_TOKEN: &str = "WALLET_BRIDGE_TOKEN";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpcConfig {
    #[serde(default = "default_ipc_port")]
    pub port: u16,
    /// Generated at startup when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            port: default_ipc_port(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcConfig {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_delay_ms(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationConfig {
    #[serde(default = "default_confirmation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageConfig {
    #[serde(default = "default_page_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_fast_probe_attempts")]
    pub fast_probe_attempts: u32,
    #[serde(default = "default_available_poll_secs")]
    pub available_poll_secs: u64,
    #[serde(default = "default_unavailable_poll_secs")]
    pub unavailable_poll_secs: u64,
    #[serde(default = "default_permission_poll_secs")]
    pub permission_poll_secs: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_page_request_timeout_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            fast_probe_attempts: default_fast_probe_attempts(),
            available_poll_secs: default_available_poll_secs(),
            unavailable_poll_secs: default_unavailable_poll_secs(),
            permission_poll_secs: default_permission_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub ipc: IpcConfig,

    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub page: PageConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ipc: IpcConfig::default(),
            rpc: RpcConfig::default(),
            confirmation: ConfirmationConfig::default(),
            page: PageConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_ipc_port() -> u16 {
    DEFAULT_IPC_PORT
}
fn default_reconnect_delay_ms() -> u64 {
    1_000
}
fn default_confirmation_timeout_secs() -> u64 {
    120
}
fn default_page_request_timeout_secs() -> u64 {
    300
}
fn default_probe_timeout_ms() -> u64 {
    500
}
fn default_fast_probe_attempts() -> u32 {
    5
}
fn default_available_poll_secs() -> u64 {
    10
}
fn default_unavailable_poll_secs() -> u64 {
    5
}
fn default_permission_poll_secs() -> u64 {
    10
}

/// `{platform config dir}/wallet-bridge`, when the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns the parsed config, or defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but is unreadable, corrupted or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Applies `WALLET_BRIDGE_PORT` and `WALLET_BRIDGE_TOKEN` on top of the file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var(ENV_IPC_PORT).ok(),
            std::env::var(ENV_AUTH_TOKEN).ok(),
        )
    }

    pub(crate) fn apply_overrides(
        &mut self,
        port: Option<String>,
        token: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = port {
            self.ipc.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::EnvironmentError {
                    location: ErrorLocation::from(Location::caller()),
                    variable: ENV_IPC_PORT,
                    reason: format!("'{port}' is not a port: {e}"),
                })?;
            info!("IPC port overridden from environment: {}", self.ipc.port);
        }
        if let Some(token) = token {
            if token.is_empty() {
                return Err(ConfigError::EnvironmentError {
                    location: ErrorLocation::from(Location::caller()),
                    variable: ENV_AUTH_TOKEN,
                    reason: "token cannot be empty".to_string(),
                });
            }
            self.ipc.auth_token = Some(token);
            info!("IPC auth token taken from environment");
        }
        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if let Some(ref token) = self.ipc.auth_token {
            if token.is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: "ipc.auth_token cannot be empty string".to_string(),
                });
            }
        }

        if self.rpc.reconnect_delay_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "rpc.reconnect_delay_ms must be positive".to_string(),
            });
        }

        if self.rpc.reconnect_max_delay_ms < self.rpc.reconnect_delay_ms {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "rpc.reconnect_max_delay_ms ({}) is below rpc.reconnect_delay_ms ({})",
                    self.rpc.reconnect_max_delay_ms, self.rpc.reconnect_delay_ms
                ),
            });
        }

        if self.rpc.request_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "rpc.request_timeout_ms must be positive when set".to_string(),
            });
        }

        if self.confirmation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "confirmation.timeout_secs must be positive".to_string(),
            });
        }

        if self.page.request_timeout_secs == 0 || self.page.probe_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "page timeouts must be positive".to_string(),
            });
        }

        for (name, secs) in [
            ("page.available_poll_secs", self.page.available_poll_secs),
            ("page.unavailable_poll_secs", self.page.unavailable_poll_secs),
            ("page.permission_poll_secs", self.page.permission_poll_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} must be positive"),
                });
            }
        }

        if !(1..=MAX_FAST_PROBE_ATTEMPTS).contains(&self.page.fast_probe_attempts) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid page.fast_probe_attempts: {} (expected 1-{})",
                    self.page.fast_probe_attempts, MAX_FAST_PROBE_ATTEMPTS
                ),
            });
        }

        Ok(())
    }
}

impl From<&RpcConfig> for RpcClientConfig {
    fn from(config: &RpcConfig) -> Self {
        Self {
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            reconnect_max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
            request_timeout: config.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl From<&PageConfig> for PageSettings {
    fn from(config: &PageConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            fast_probe_attempts: config.fast_probe_attempts,
            available_poll_interval: Duration::from_secs(config.available_poll_secs),
            unavailable_poll_interval: Duration::from_secs(config.unavailable_poll_secs),
            permission_poll_interval: Duration::from_secs(config.permission_poll_secs),
        }
    }
}
