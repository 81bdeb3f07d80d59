//! Bridge configuration types.
//!
//! [`BridgeConfig`] holds every runtime setting of the Telnet side of the
//! bridge.  It is built once at startup (from defaults, the TOML file, and CLI
//! arguments, in that order of precedence) and then shared read-only.

use std::net::SocketAddr;
use std::time::Duration;

/// Default Telnet port.
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// Default number of simultaneous Telnet clients.
pub const DEFAULT_MAX_CLIENTS: usize = 8;

/// Default name shown in lifecycle notices.
pub const DEFAULT_DEVICE_NAME: &str = "Wireless serial";

/// All runtime configuration for the Telnet side of the bridge.
///
/// # Example
///
/// ```rust
/// use serial_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.listen_addr.port(), 23);
/// assert_eq!(cfg.max_clients, 8);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the Telnet listener binds to.  A fresh listener is bound at
    /// the start of every network session.
    pub listen_addr: SocketAddr,

    /// Size of the client table.  Connections beyond this are accepted and
    /// closed straight away.
    pub max_clients: usize,

    /// Upper bound on one readiness wait of the event loop.  The loop checks
    /// the shutdown flag at least this often.
    pub poll_timeout: Duration,

    /// Bytes read from a client socket per readiness event.
    pub read_buffer_size: usize,

    /// How long the serial line is held in the break condition when a client
    /// sends `IAC BREAK`.
    pub break_duration: Duration,

    /// Pause before retrying after the listener could not be created.
    pub rebind_delay: Duration,

    /// Name used in the lifecycle notices broadcast to clients.
    pub device_name: String,
}

impl Default for BridgeConfig {
    /// | Field            | Default            |
    /// |------------------|--------------------|
    /// | listen_addr      | `0.0.0.0:23`       |
    /// | max_clients      | 8                  |
    /// | poll_timeout     | 5 seconds          |
    /// | read_buffer_size | 256 bytes          |
    /// | break_duration   | 250 ms             |
    /// | rebind_delay     | 1 second           |
    /// | device_name      | `Wireless serial`  |
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_TELNET_PORT)),
            max_clients: DEFAULT_MAX_CLIENTS,
            poll_timeout: Duration::from_secs(5),
            read_buffer_size: 256,
            break_duration: Duration::from_millis(250),
            rebind_delay: Duration::from_secs(1),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listens_on_all_interfaces_port_23() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "0.0.0.0:23");
    }

    #[test]
    fn test_default_client_capacity_is_8() {
        assert_eq!(BridgeConfig::default().max_clients, 8);
    }

    #[test]
    fn test_default_poll_timeout_is_finite() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.poll_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_default_read_buffer_is_256() {
        assert_eq!(BridgeConfig::default().read_buffer_size, 256);
    }

    #[test]
    fn test_default_device_name() {
        assert_eq!(BridgeConfig::default().device_name, "Wireless serial");
    }

    #[test]
    fn test_config_custom_values() {
        let cfg = BridgeConfig {
            listen_addr: "127.0.0.1:2323".parse().unwrap(),
            max_clients: 2,
            ..BridgeConfig::default()
        };
        assert_eq!(cfg.listen_addr.port(), 2323);
        assert_eq!(cfg.max_clients, 2);
        assert_eq!(cfg.rebind_delay, Duration::from_secs(1));
    }
}
