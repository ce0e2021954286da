//! Wire protocol shared by `netfs-agent` and `netfs-layer`: framing, the
//! per-opcode request/reply bodies, and directory-tree marshalling. Every
//! type here is plain data — no I/O, no sockets — so both binaries and this
//! crate's own tests can exercise it over any `Read`/`Write` pair.

pub mod error;
pub mod file;
pub mod frame;
pub mod opcode;
pub mod tree;

pub use error::ProtocolError;
pub use opcode::Opcode;

/// Splits the fd namespace between descriptors the layer serves locally
/// (`[0, OFFSET)`) and descriptors that name an open file on the remote
/// agent (`[OFFSET, ...)`, stored on the wire as `remote_fd = fd - OFFSET`).
pub const OFFSET: u64 = 25_000;
