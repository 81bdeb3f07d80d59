//! Infrastructure layer for serial-bridge.
//!
//! Everything here touches the outside world: TCP sockets, the serial device,
//! Tokio channels shared between tasks, and the configuration file.
//!
//! | Module           | Role                                               |
//! |------------------|----------------------------------------------------|
//! | `telnet_server`  | Listener, client table, readiness event loop       |
//! | `fan_out`        | Serial and lifecycle events → broadcast requests   |
//! | `uart`           | `tokio-serial` driver task behind `SerialTransport` |
//! | `network_signal` | `watch`-based `NetworkReadiness`                   |
//! | `event_bus`      | `broadcast`-based lifecycle event bus              |
//! | `storage`        | TOML configuration file                            |

pub mod event_bus;
pub mod fan_out;
pub mod network_signal;
pub mod storage;
pub mod telnet_server;
pub mod uart;

pub use event_bus::EventBus;
pub use fan_out::FanOut;
pub use network_signal::NetworkSignal;
pub use telnet_server::{broadcast_channel, TelnetServer};
pub use uart::{open_uart, UartHandle};
