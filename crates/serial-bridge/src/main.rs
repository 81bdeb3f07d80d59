//! serial-bridge: Telnet-to-serial bridge entry point.
//!
//! Opens one serial device and serves it to up to `max_clients` Telnet clients
//! at once.  Client keystrokes go to the serial port; serial output goes to
//! every client.
//!
//! # Usage
//!
//! ```text
//! serial-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>         TOML configuration file
//!   --listen <ADDR>         Telnet listen address [default: 0.0.0.0:23]
//!   --max-clients <N>       Simultaneous Telnet clients [default: 8]
//!   --device <PATH>         Serial device [default: /dev/ttyUSB0]
//!   --baud <RATE>           Baud rate [default: 115200]
//!   --poll-timeout <SECS>   Event loop wait bound [default: 5]
//!   --break-ms <MS>         Serial break length [default: 250]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the `--config` file, then command-line arguments
//! (or their environment variables).  Each level overrides the one before.
//!
//! | Variable                     | Argument          |
//! |------------------------------|-------------------|
//! | `SERIAL_BRIDGE_CONFIG`       | `--config`        |
//! | `SERIAL_BRIDGE_LISTEN`       | `--listen`        |
//! | `SERIAL_BRIDGE_MAX_CLIENTS`  | `--max-clients`   |
//! | `SERIAL_BRIDGE_DEVICE`       | `--device`        |
//! | `SERIAL_BRIDGE_BAUD`         | `--baud`          |
//! | `SERIAL_BRIDGE_POLL_TIMEOUT` | `--poll-timeout`  |
//! | `SERIAL_BRIDGE_BREAK_MS`     | `--break-ms`      |
//!
//! `RUST_LOG` overrides the `[log] level` from the file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use serial_bridge::domain::{BridgeConfig, LifecycleEvent, SerialSettings};
use serial_bridge::infrastructure::storage::{load_config, validate, FileConfig};
use serial_bridge::infrastructure::{
    broadcast_channel, open_uart, EventBus, FanOut, NetworkSignal, TelnetServer,
};

/// Time given to the power-down notice to reach clients before the sockets
/// are closed.
const SHUTDOWN_NOTICE_GRACE: Duration = Duration::from_millis(200);

/// How long to wait for the fan-out task to drain after the server stopped.
const FAN_OUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Telnet-to-serial bridge.
///
/// Every field is optional so that a value left out on the command line does
/// not override the configuration file.
#[derive(Debug, Parser)]
#[command(
    name = "serial-bridge",
    about = "Share one serial port with several Telnet clients",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "SERIAL_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address the Telnet listener binds to, e.g. `0.0.0.0:23`.
    #[arg(long, env = "SERIAL_BRIDGE_LISTEN")]
    listen: Option<SocketAddr>,

    /// Maximum number of simultaneous Telnet clients.
    #[arg(long, env = "SERIAL_BRIDGE_MAX_CLIENTS")]
    max_clients: Option<usize>,

    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`.
    #[arg(long, env = "SERIAL_BRIDGE_DEVICE")]
    device: Option<String>,

    /// Serial baud rate.
    #[arg(long, env = "SERIAL_BRIDGE_BAUD")]
    baud: Option<u32>,

    /// Upper bound, in seconds, on one wait of the event loop.
    #[arg(long, env = "SERIAL_BRIDGE_POLL_TIMEOUT")]
    poll_timeout: Option<u64>,

    /// How long, in milliseconds, a Telnet BREAK holds the serial line low.
    #[arg(long, env = "SERIAL_BRIDGE_BREAK_MS")]
    break_ms: Option<u64>,
}

/// Fully merged startup settings.
#[derive(Debug)]
struct Settings {
    bridge: BridgeConfig,
    serial: SerialSettings,
    log_level: String,
}

impl Cli {
    /// Loads the configuration file (if any) and applies the CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the merged
    /// configuration is unusable.
    fn into_settings(self) -> anyhow::Result<Settings> {
        let file = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };

        let mut bridge = file.bridge.to_bridge_config();
        let mut serial = file.serial;

        if let Some(listen) = self.listen {
            bridge.listen_addr = listen;
        }
        if let Some(max_clients) = self.max_clients {
            bridge.max_clients = max_clients;
        }
        if let Some(secs) = self.poll_timeout {
            bridge.poll_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.break_ms {
            bridge.break_duration = Duration::from_millis(ms);
        }
        if let Some(device) = self.device {
            serial.device = device;
        }
        if let Some(baud) = self.baud {
            serial.baud_rate = baud;
        }

        validate(&bridge).context("invalid bridge configuration")?;

        Ok(Settings {
            bridge,
            serial,
            log_level: file.log.level,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments and the optional config file are merged into [`Settings`].
/// 2. `tracing_subscriber` is initialised; `RUST_LOG` wins over the file's
///    log level.
/// 3. The serial device is opened and its driver task started.
/// 4. The fan-out task and the Telnet server task are spawned.
/// 5. On Ctrl+C a power-down notice is broadcast, then the server is told to
///    stop and awaited.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().into_settings()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    info!(
        "serial bridge starting: telnet={}, serial={}, max_clients={}",
        settings.bridge.listen_addr, settings.serial, settings.bridge.max_clients
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let (uart, serial_events) = open_uart(&settings.serial)
        .with_context(|| format!("failed to start serial device {}", settings.serial.device))?;

    let bus = EventBus::new();

    // On a host the operating system manages the interfaces; the signal only
    // gates the first listen.
    let network = NetworkSignal::new();
    network.set_ready();

    let (broadcast_tx, broadcast_rx) = broadcast_channel();
    let fan_out = FanOut::new(
        serial_events,
        bus.subscribe(),
        broadcast_tx,
        settings.bridge.device_name.clone(),
    );
    let fan_out_task = tokio::spawn(fan_out.run());

    let server = TelnetServer::new(
        settings.bridge,
        Arc::new(uart),
        Arc::new(network),
        broadcast_rx,
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let server_task = tokio::spawn(server.run(Arc::clone(&running)));

    bus.publish(LifecycleEvent::PowerOn);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C signal")?;
    info!("received Ctrl+C; initiating graceful shutdown");

    bus.publish(LifecycleEvent::PowerDown);
    tokio::time::sleep(SHUTDOWN_NOTICE_GRACE).await;
    running.store(false, Ordering::Relaxed);

    server_task.await.context("Telnet server task failed")?;

    drop(bus);
    if tokio::time::timeout(FAN_OUT_DRAIN_TIMEOUT, fan_out_task)
        .await
        .is_err()
    {
        warn!("fan-out task did not stop in time");
    }

    info!("serial bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
