//! Application layer for serial-bridge.
//!
//! The application layer knows *what* happens to bytes and events; the
//! infrastructure layer knows *how* to move them.
//!
//! # Responsibilities
//!
//! - Declaring the serial port and network readiness collaborators as traits
//! - Running client input through the Telnet decoder and onto the serial port
//! - Turning lifecycle events into the lines shown to Telnet users
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or serial devices (that is infrastructure)
//! - Tokio task spawning

pub mod forward_input;
pub mod notices;
pub mod ports;

pub use forward_input::{forward_client_input, InputReport};
pub use notices::lifecycle_notice;
pub use ports::{NetworkReadiness, SerialError, SerialTransport};
