//! serial-bridge library crate.
//!
//! This crate shares one serial port (UART) with several Telnet clients.
//! Whatever a client types is written to the serial port; whatever the serial
//! port produces is copied to every client.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Telnet clients (TCP, port 23)
//!         ↕
//! [serial-bridge]
//!   ├── domain/           Pure types: BridgeConfig, SerialSettings, events
//!   ├── application/      Collaborator traits, client input forwarding,
//!   │                     lifecycle notices
//!   └── infrastructure/
//!         ├── telnet_server/  Listener + multiplexed event loop
//!         ├── fan_out/        Serial/lifecycle events → broadcast requests
//!         ├── uart/           tokio-serial driver task
//!         ├── network_signal/ "Network is up" signal
//!         ├── event_bus/      Lifecycle event bus
//!         └── storage/        TOML configuration file
//!         ↕
//! Serial device (UART)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `serial-bridge-core` only; the
//!   serial port and the network are reached through traits it defines.
//! - `infrastructure` implements those traits with `tokio` and
//!   `tokio-serial`.

/// Domain layer: configuration and event types (no I/O).
pub mod domain;

/// Application layer: collaborator traits and byte forwarding logic.
pub mod application;

/// Infrastructure layer: sockets, serial driver, signals, config file.
pub mod infrastructure;
