//! Domain layer for serial-bridge.
//!
//! Pure types with no dependencies on I/O, sockets, or the async runtime.
//!
//! # What belongs in the domain layer?
//!
//! - Configuration structures (bridge and serial line settings)
//! - Events produced by the serial driver and the device lifecycle
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or serial port types
//! - File I/O or environment variable reading

pub mod config;
pub mod events;
pub mod serial;

pub use config::BridgeConfig;
pub use events::{LifecycleEvent, SerialEvent};
pub use serial::{DataBits, FlowControl, Parity, SerialSettings, StopBits};
