use std::io;

use thiserror::Error;

/// Errors raised by the codec and transport layers (spec.md §4.1, §7.2).
///
/// These are fatal to whichever side encounters them: a malformed frame or
/// an unknown opcode means the peer isn't speaking this protocol correctly,
/// and there's no partial-recovery path — the connection is torn down.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame declared length {declared} but body was {actual} bytes")]
    MalformedFrame { declared: u32, actual: usize },

    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("body too short for opcode {opcode:?}: need at least {need} bytes, got {got}")]
    ShortBody {
        opcode: Option<crate::opcode::Opcode>,
        need: usize,
        got: usize,
    },

    #[error("peer closed the connection")]
    TransportClosed,

    #[error("peer closed the connection mid-frame")]
    ShortFrame,

    #[error("path contains an embedded NUL byte")]
    EmbeddedNul,

    #[error(transparent)]
    Io(#[from] io::Error),
}
