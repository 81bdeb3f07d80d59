//! Storage infrastructure: the optional TOML configuration file.
//!
//! Only reading is supported; the bridge never writes its configuration back.

pub mod config_file;

pub use config_file::{load_config, validate, ConfigError, FileConfig};
