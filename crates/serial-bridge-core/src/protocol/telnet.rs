//! Telnet command bytes, option codes, and the connection greeting.
//!
//! Only the subset of RFC 854 the bridge needs is named here.  Every command
//! starts with [`IAC`]; the byte after it selects the command.

use std::fmt;

/// Interpret As Command: the escape byte that introduces every control sequence.
pub const IAC: u8 = 0xFF;
/// "You are not to use option."
pub const DONT: u8 = 0xFE;
/// "Please, you use option."
pub const DO: u8 = 0xFD;
/// "I won't use option."
pub const WONT: u8 = 0xFC;
/// "I will use option."
pub const WILL: u8 = 0xFB;
/// Start of a sub-negotiation block.
pub const SB: u8 = 0xFA;
/// Break: the remote end asks for a serial line break.
pub const BREAK: u8 = 0xF3;
/// No operation.
pub const NOP: u8 = 0xF1;
/// End of a sub-negotiation block.
pub const SE: u8 = 0xF0;

/// Echo option (RFC 857).
pub const OPT_ECHO: u8 = 1;
/// Suppress Go Ahead option (RFC 858).
pub const OPT_SGA: u8 = 3;
/// Terminal type option (RFC 1091).
pub const OPT_TTYPE: u8 = 24;
/// Negotiate About Window Size option (RFC 1073).
pub const OPT_NAWS: u8 = 31;

/// Bytes sent once to every client right after it is accepted.
///
/// Four 3-byte commands: DO ECHO, DO NAWS, WILL ECHO, WILL SGA.  Together they
/// put a typical Telnet client into character-at-a-time mode with remote echo,
/// which is what a serial console expects.  Replies are never awaited; the
/// decoder simply discards whatever the client answers.
pub const GREETING: [u8; 12] = [
    IAC, DO, OPT_ECHO, //
    IAC, DO, OPT_NAWS, //
    IAC, WILL, OPT_ECHO, //
    IAC, WILL, OPT_SGA, //
];

/// One of the four option negotiation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationVerb {
    Do,
    Dont,
    Will,
    Wont,
}

impl NegotiationVerb {
    /// Maps a command byte to a verb, or `None` if the byte is not a verb.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            DO => Some(Self::Do),
            DONT => Some(Self::Dont),
            WILL => Some(Self::Will),
            WONT => Some(Self::Wont),
            _ => None,
        }
    }

    /// Returns the command byte for this verb.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Do => DO,
            Self::Dont => DONT,
            Self::Will => WILL,
            Self::Wont => WONT,
        }
    }
}

impl fmt::Display for NegotiationVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Do => "DO",
            Self::Dont => "DONT",
            Self::Will => "WILL",
            Self::Wont => "WONT",
        };
        f.write_str(name)
    }
}

/// Returns a readable name for the option codes that show up in practice.
pub fn option_name(option: u8) -> Option<&'static str> {
    match option {
        0 => Some("BINARY"),
        OPT_ECHO => Some("ECHO"),
        OPT_SGA => Some("SGA"),
        5 => Some("STATUS"),
        6 => Some("TIMING-MARK"),
        OPT_TTYPE => Some("TTYPE"),
        OPT_NAWS => Some("NAWS"),
        32 => Some("TSPEED"),
        33 => Some("LFLOW"),
        34 => Some("LINEMODE"),
        36 => Some("OLD-ENVIRON"),
        39 => Some("NEW-ENVIRON"),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
