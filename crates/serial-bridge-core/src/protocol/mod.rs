//! Protocol module containing Telnet constants and the frame decoder.

pub mod decoder;
pub mod telnet;

pub use decoder::{Decoded, DecoderState, Step, TelnetCommand, TelnetDecoder};
pub use telnet::{NegotiationVerb, GREETING};
