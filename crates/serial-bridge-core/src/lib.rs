//! # serial-bridge-core
//!
//! Shared library for the Telnet-to-serial bridge containing the Telnet frame
//! decoder and the fixed-capacity client table.
//!
//! This crate has zero dependencies on OS APIs, async runtimes, or network
//! sockets.  Everything here is a plain state machine or data structure, so it
//! can be unit tested byte by byte.
//!
//! # Architecture overview (for beginners)
//!
//! The bridge exposes a device's UART as a Telnet session that several TCP
//! clients can share.  Bytes typed by a client travel to the serial port;
//! bytes arriving on the serial port are copied to every client.
//!
//! Telnet mixes control sequences into the data stream.  A control sequence
//! always starts with the escape byte IAC (`0xFF`).  Terminals use them to
//! negotiate options ("please echo", "my window is 80x24", ...) and to request
//! a serial BREAK.  The bridge never wants those bytes on the wire, so each
//! connection runs them through a [`TelnetDecoder`] which keeps the data and
//! swallows the rest.
//!
//! - **`protocol`** – Telnet constants, the connection greeting, and the
//!   per-connection decoder.
//!
//! - **`table`** – The [`ClientTable`]: a fixed number of slots, each either
//!   free or holding one connection.

pub mod protocol;
pub mod table;

pub use protocol::decoder::{Decoded, DecoderState, Step, TelnetCommand, TelnetDecoder};
pub use protocol::telnet::{NegotiationVerb, GREETING};
pub use table::ClientTable;
