use thiserror::Error;

/// Errors a hook can hit before it ever reaches the point of translating a
/// remote errno back to the caller. Every hook catches this at its top
/// level and converts it to an errno plus the primitive's sentinel return
/// value (spec.md §4.2.3) — it never unwinds across the FFI boundary.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("connection to remote agent was never established")]
    NotConnected,

    #[error("transport error talking to remote agent: {0}")]
    Protocol(#[from] netfs_protocol::ProtocolError),

    #[error("i/o error talking to remote agent: {0}")]
    Io(#[from] std::io::Error),
}

impl LayerError {
    /// The errno a hook should set before returning its sentinel failure
    /// value, for error classes that aren't the in-band remote-OS-error
    /// channel (that channel is handled directly in `ops`, not through
    /// this type).
    pub fn as_errno(&self) -> i32 {
        match self {
            Self::NotConnected => libc::ENOTCONN,
            Self::Protocol(_) => libc::EIO,
            Self::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
