//! Traits for the collaborators the bridge drives but does not own.
//!
//! The event loop talks to the serial port and waits for the network through
//! these traits.  Infrastructure provides the real implementations (a
//! tokio-serial driver, a watch-channel signal); tests provide recording or
//! mocked ones.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a [`SerialTransport`].
#[derive(Debug, Error)]
pub enum SerialError {
    /// The serial device could not be opened.
    #[error("failed to open serial device {device}: {reason}")]
    Open { device: String, reason: String },

    /// An I/O error occurred on the open device.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The driver task has stopped, so the port is no longer reachable.
    #[error("serial driver is not running")]
    Disconnected,
}

/// Byte-oriented access to the UART.
///
/// Receive data does not come through this trait; the driver pushes it as
/// [`crate::domain::SerialEvent`]s on a channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialTransport: Send + Sync {
    /// Writes `data` to the line and returns how many bytes were accepted.
    async fn write(&self, data: &[u8]) -> Result<usize, SerialError>;

    /// Holds the transmit line in the break condition for `duration`.
    async fn send_break(&self, duration: Duration) -> Result<(), SerialError>;
}

/// "The network has an address" signal.
#[async_trait]
pub trait NetworkReadiness: Send + Sync {
    /// Returns once the network is ready.  Returns immediately if it already is.
    async fn wait_ready(&self);

    /// Non-blocking check.
    fn is_ready(&self) -> bool;
}
