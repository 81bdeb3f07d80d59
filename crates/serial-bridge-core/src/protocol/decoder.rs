//! Per-connection Telnet frame decoder.
//!
//! The decoder looks at one byte at a time and decides whether it is terminal
//! data (to be written to the serial port) or part of a Telnet control
//! sequence (to be swallowed).  It needs no lookahead buffer: everything it
//! has to remember between bytes fits in [`DecoderState`].
//!
//! # State machine
//!
//! ```text
//!            IAC                 DO/DONT/WILL/WONT
//!   Idle ─────────► Escape ─────────────────────────► Negotiation(verb)
//!    ▲  ◄── other ──┘ │  │ SB                                │ option byte
//!    │   (BREAK ⇒     │  └──────► SubNegotiation ◄─┐         │
//!    │    Command)    │              │ IAC   other ┘         │
//!    │                │              ▼                       │
//!    │                │      SubNegotiationEscape            │
//!    └────────────────┴──────────────┴───────────────────────┘
//! ```
//!
//! Every state has a successor for every byte, so malformed input can never
//! wedge a connection or produce an error.  Sub-negotiation payload is
//! discarded entirely; the `IAC <any>` pair ends it (normally `IAC SE`).

use crate::protocol::telnet::{NegotiationVerb, BREAK, IAC, SB};

/// Where the decoder is inside the Telnet byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// Plain data.
    #[default]
    Idle,
    /// Saw IAC; the next byte selects the command.
    Escape,
    /// Saw `IAC <verb>`; the next byte is the option code.
    Negotiation(NegotiationVerb),
    /// Inside `IAC SB ...`; payload is discarded.
    SubNegotiation,
    /// Saw IAC inside a sub-negotiation; the next byte ends it.
    SubNegotiationEscape,
}

/// A complete control command recognised in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelnetCommand {
    /// `IAC BREAK`: the caller should send a break on the serial line.
    Break,
    /// `IAC <verb> <option>`.  The bridge never answers these.
    Negotiate {
        verb: NegotiationVerb,
        option: u8,
    },
}

/// Result of feeding one byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The byte is terminal data and must be forwarded unchanged.
    Forward(u8),
    /// The byte was part of a control sequence and produces nothing.
    Discard,
    /// The byte completed a command.  Produces no data byte.
    Command(TelnetCommand),
}

/// Bytes and commands produced by [`TelnetDecoder::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Forwardable data, in input order.
    pub data: Vec<u8>,
    /// Commands, in input order.
    pub commands: Vec<TelnetCommand>,
}

/// Telnet decoder for a single connection.
///
/// # Examples
///
/// ```rust
/// use serial_bridge_core::{Step, TelnetCommand, TelnetDecoder};
///
/// let mut decoder = TelnetDecoder::new();
/// assert_eq!(decoder.step(b'h'), Step::Forward(b'h'));
/// assert_eq!(decoder.step(0xFF), Step::Discard);
/// assert_eq!(decoder.step(0xF3), Step::Command(TelnetCommand::Break));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TelnetDecoder {
    state: DecoderState,
}

impl TelnetDecoder {
    /// Creates a decoder in the [`DecoderState::Idle`] state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Drops any partially received command and returns to `Idle`.
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
    }

    /// Consumes one byte and advances the state machine.
    ///
    /// A literal NUL in `Idle` is ordinary data and is forwarded.
    pub fn step(&mut self, byte: u8) -> Step {
        let (next, step) = match self.state {
            DecoderState::Idle if byte == IAC => (DecoderState::Escape, Step::Discard),
            DecoderState::Idle => (DecoderState::Idle, Step::Forward(byte)),

            DecoderState::Escape => match NegotiationVerb::from_byte(byte) {
                Some(verb) => (DecoderState::Negotiation(verb), Step::Discard),
                None if byte == SB => (DecoderState::SubNegotiation, Step::Discard),
                None if byte == BREAK => {
                    (DecoderState::Idle, Step::Command(TelnetCommand::Break))
                }
                // Unrecognised command byte (NOP, GA, a second IAC, ...).
                None => (DecoderState::Idle, Step::Discard),
            },

            DecoderState::Negotiation(verb) => (
                DecoderState::Idle,
                Step::Command(TelnetCommand::Negotiate {
                    verb,
                    option: byte,
                }),
            ),

            DecoderState::SubNegotiation if byte == IAC => {
                (DecoderState::SubNegotiationEscape, Step::Discard)
            }
            DecoderState::SubNegotiation => (DecoderState::SubNegotiation, Step::Discard),

            DecoderState::SubNegotiationEscape => (DecoderState::Idle, Step::Discard),
        };

        self.state = next;
        step
    }

    /// Runs a whole buffer through [`step`](Self::step), collecting data and
    /// commands separately.
    pub fn decode(&mut self, input: &[u8]) -> Decoded {
        let mut decoded = Decoded {
            data: Vec::with_capacity(input.len()),
            commands: Vec::new(),
        };
        for &byte in input {
            match self.step(byte) {
                Step::Forward(b) => decoded.data.push(b),
                Step::Discard => {}
                Step::Command(cmd) => decoded.commands.push(cmd),
            }
        }
        decoded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
