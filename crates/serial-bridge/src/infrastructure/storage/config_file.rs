//! TOML configuration file for the bridge.
//!
//! Every table and every field is optional; anything left out takes the
//! built-in default.  A complete file looks like:
//!
//! ```toml
//! [bridge]
//! listen = "0.0.0.0:23"
//! max_clients = 8
//! poll_timeout_secs = 5
//! read_buffer_size = 256
//! break_ms = 250
//! rebind_delay_ms = 1000
//! device_name = "Wireless serial"
//!
//! [serial]
//! device = "/dev/ttyUSB0"
//! baud_rate = 115200
//! data_bits = 8
//! parity = "none"
//! stop_bits = 1
//! flow_control = "none"
//!
//! [log]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! `#[serde(default = "some_fn")]` fills a missing field with `some_fn()`, and
//! `#[serde(default)]` on a whole table falls back to its `Default` impl.
//! Unknown keys are rejected so that a typo does not silently keep a default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{DEFAULT_DEVICE_NAME, DEFAULT_MAX_CLIENTS, DEFAULT_TELNET_PORT};
use crate::domain::{BridgeConfig, SerialSettings};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// Top-level layout of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub log: LogSection,
}

/// The `[bridge]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_break_ms")]
    pub break_ms: u64,
    #[serde(default = "default_rebind_delay_ms")]
    pub rebind_delay_ms: u64,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// The `[log]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_TELNET_PORT))
}
fn default_max_clients() -> usize {
    DEFAULT_MAX_CLIENTS
}
fn default_poll_timeout_secs() -> u64 {
    5
}
fn default_read_buffer_size() -> usize {
    256
}
fn default_break_ms() -> u64 {
    250
}
fn default_rebind_delay_ms() -> u64 {
    1000
}
fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_clients: default_max_clients(),
            poll_timeout_secs: default_poll_timeout_secs(),
            read_buffer_size: default_read_buffer_size(),
            break_ms: default_break_ms(),
            rebind_delay_ms: default_rebind_delay_ms(),
            device_name: default_device_name(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl BridgeSection {
    /// Converts the file representation into the runtime configuration.
    pub fn to_bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            listen_addr: self.listen,
            max_clients: self.max_clients,
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            read_buffer_size: self.read_buffer_size,
            break_duration: Duration::from_millis(self.break_ms),
            rebind_delay: Duration::from_millis(self.rebind_delay_ms),
            device_name: self.device_name.clone(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist) and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Rejects settings the event loop cannot run with.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first offending field.
pub fn validate(config: &BridgeConfig) -> Result<(), ConfigError> {
    if config.max_clients == 0 {
        return Err(ConfigError::Invalid("max_clients must be at least 1".into()));
    }
    if config.poll_timeout.is_zero() {
        return Err(ConfigError::Invalid(
            "poll timeout must be greater than zero".into(),
        ));
    }
    if config.read_buffer_size == 0 {
        return Err(ConfigError::Invalid(
            "read_buffer_size must be at least 1".into(),
        ));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
