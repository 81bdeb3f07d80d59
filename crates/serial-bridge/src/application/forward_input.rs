//! Client → serial forwarding.
//!
//! Every chunk read from a client socket goes through that client's
//! [`TelnetDecoder`].  Data bytes are collected into one run and written to the
//! serial port with a single call, so a burst from one client reaches the line
//! contiguous and in order.  Control commands never reach the line as bytes:
//! a BREAK becomes a [`SerialTransport::send_break`] call, negotiation is
//! logged and otherwise ignored.
//!
//! ```text
//! socket bytes ──► TelnetDecoder ──► Forward(b)  ──► run ──► write(run)
//!                                ├─► Break       ──► send_break()
//!                                ├─► Negotiate   ──► debug log
//!                                └─► Discard
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use serial_bridge_core::protocol::telnet::option_name;
use serial_bridge_core::{Step, TelnetCommand, TelnetDecoder};
use tracing::{debug, warn};

use crate::application::ports::SerialTransport;

/// What one chunk of client input turned into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputReport {
    /// Data bytes produced by the decoder.
    pub forwarded: usize,
    /// Bytes the serial port accepted (0 if the write failed).
    pub written: usize,
    /// BREAK commands seen.
    pub breaks: usize,
    /// Negotiation commands seen (and ignored).
    pub negotiations: usize,
}

/// Decodes `input` from the client at `peer` and forwards it to `serial`.
///
/// Breaks are sent as soon as they are recognised; the data run is written
/// once at the end.  Serial errors are logged, never returned: a failing
/// serial port must not disconnect the Telnet client.
pub async fn forward_client_input(
    decoder: &mut TelnetDecoder,
    peer: SocketAddr,
    input: &[u8],
    serial: &dyn SerialTransport,
    break_duration: Duration,
) -> InputReport {
    let mut report = InputReport::default();
    let mut run = Vec::with_capacity(input.len());

    for &byte in input {
        match decoder.step(byte) {
            Step::Forward(b) => run.push(b),
            Step::Discard => {}
            Step::Command(TelnetCommand::Break) => {
                report.breaks += 1;
                warn!(%peer, "client requested a serial break");
                if let Err(e) = serial.send_break(break_duration).await {
                    warn!(%peer, "serial break failed: {e}");
                }
            }
            Step::Command(TelnetCommand::Negotiate { verb, option }) => {
                report.negotiations += 1;
                debug!(
                    %peer,
                    "ignoring IAC {verb} {option} ({})",
                    option_name(option).unwrap_or("unknown")
                );
            }
        }
    }

    report.forwarded = run.len();
    if run.is_empty() {
        return report;
    }

    match serial.write(&run).await {
        Ok(n) => {
            if n < run.len() {
                warn!(%peer, "serial port accepted {n} of {} bytes", run.len());
            }
            report.written = n;
        }
        Err(e) => warn!(%peer, "serial write of {} bytes failed: {e}", run.len()),
    }
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockSerialTransport, SerialError};
    use serial_bridge_core::DecoderState;

    const BREAK_LEN: Duration = Duration::from_millis(250);

    fn peer() -> SocketAddr {
        "192.168.4.2:50123".parse().unwrap()
    }

    #[tokio::test]
    async fn test_plain_text_is_written_once() {
        // Arrange
        let mut serial = MockSerialTransport::new();
        serial
            .expect_write()
            .withf(|data| data == b"hello".as_slice())
            .times(1)
            .returning(|data| Ok(data.len()));
        serial.expect_send_break().never();
        let mut decoder = TelnetDecoder::new();

        // Act
        let report =
            forward_client_input(&mut decoder, peer(), b"hello", &serial, BREAK_LEN).await;

        // Assert
        assert_eq!(report.forwarded, 5);
        assert_eq!(report.written, 5);
    }

    #[tokio::test]
    async fn test_do_echo_then_hi_writes_only_hi() {
        let mut serial = MockSerialTransport::new();
        serial
            .expect_write()
            .withf(|data| data == b"hi".as_slice())
            .times(1)
            .returning(|data| Ok(data.len()));
        let mut decoder = TelnetDecoder::new();

        let report = forward_client_input(
            &mut decoder,
            peer(),
            &[0xFF, 0xFD, 0x01, 0x68, 0x69],
            &serial,
            BREAK_LEN,
        )
        .await;

        assert_eq!(report.negotiations, 1);
        assert_eq!(report.written, 2);
    }

    #[tokio::test]
    async fn test_iac_break_sends_one_break_and_writes_nothing() {
        // Arrange: write must never be called.
        let mut serial = MockSerialTransport::new();
        serial
            .expect_send_break()
            .withf(|duration| *duration == BREAK_LEN)
            .times(1)
            .returning(|_| Ok(()));
        serial.expect_write().never();
        let mut decoder = TelnetDecoder::new();

        // Act
        let report =
            forward_client_input(&mut decoder, peer(), &[0xFF, 0xF3], &serial, BREAK_LEN).await;

        // Assert
        assert_eq!(report.breaks, 1);
        assert_eq!(report.forwarded, 0);
    }

    #[tokio::test]
    async fn test_negotiation_only_input_touches_nothing() {
        let mut serial = MockSerialTransport::new();
        serial.expect_write().never();
        serial.expect_send_break().never();
        let mut decoder = TelnetDecoder::new();

        let input = [0xFF, 0xFB, 0x18, 0xFF, 0xFA, 0x1F, 0, 80, 0, 24, 0xFF, 0xF0];
        let report = forward_client_input(&mut decoder, peer(), &input, &serial, BREAK_LEN).await;

        assert_eq!(report, InputReport {
            negotiations: 1,
            ..InputReport::default()
        });
        assert_eq!(decoder.state(), DecoderState::Idle);
    }

    #[tokio::test]
    async fn test_nul_byte_reaches_serial() {
        let mut serial = MockSerialTransport::new();
        serial
            .expect_write()
            .withf(|data| data == b"\r\0".as_slice())
            .times(1)
            .returning(|data| Ok(data.len()));
        let mut decoder = TelnetDecoder::new();

        let report =
            forward_client_input(&mut decoder, peer(), &[b'\r', 0x00], &serial, BREAK_LEN).await;

        assert_eq!(report.written, 2);
    }

    #[tokio::test]
    async fn test_serial_write_failure_is_swallowed() {
        let mut serial = MockSerialTransport::new();
        serial
            .expect_write()
            .times(1)
            .returning(|_| Err(SerialError::Disconnected));
        let mut decoder = TelnetDecoder::new();

        let report = forward_client_input(&mut decoder, peer(), b"x", &serial, BREAK_LEN).await;

        assert_eq!(report.forwarded, 1);
        assert_eq!(report.written, 0);
    }

    #[tokio::test]
    async fn test_break_failure_does_not_stop_data() {
        let mut serial = MockSerialTransport::new();
        serial
            .expect_send_break()
            .times(1)
            .returning(|_| Err(SerialError::Disconnected));
        serial
            .expect_write()
            .withf(|data| data == b"ab".as_slice())
            .times(1)
            .returning(|data| Ok(data.len()));
        let mut decoder = TelnetDecoder::new();

        let report =
            forward_client_input(&mut decoder, peer(), &[b'a', 0xFF, 0xF3, b'b'], &serial, BREAK_LEN)
                .await;

        assert_eq!(report.breaks, 1);
        assert_eq!(report.written, 2);
    }

    #[tokio::test]
    async fn test_command_split_across_chunks() {
        let mut serial = MockSerialTransport::new();
        serial.expect_send_break().times(1).returning(|_| Ok(()));
        serial.expect_write().times(2).returning(|data| Ok(data.len()));
        let mut decoder = TelnetDecoder::new();

        let first = forward_client_input(&mut decoder, peer(), b"a\xFF", &serial, BREAK_LEN).await;
        let second =
            forward_client_input(&mut decoder, peer(), b"\xF3b", &serial, BREAK_LEN).await;

        assert_eq!(first.written, 1);
        assert_eq!(second.breaks, 1);
        assert_eq!(second.written, 1);
    }
}
