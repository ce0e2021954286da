//! The single connection to the remote agent, and the send-then-receive
//! exchange every hook drives it through.
//!
//! spec.md §4.2's "Thread safety" requirement (absent from the original C
//! source, required here): multiple application threads can call hooked
//! primitives concurrently, but there is exactly one `TcpStream`, so a
//! roundtrip holds a [`Mutex`] for its full send-then-receive exchange
//! rather than racing two requests' bytes onto the wire.

use std::net::TcpStream;
use std::sync::{Mutex, OnceLock};

use netfs_protocol::frame;

use crate::error::LayerError;

static CONNECTION: OnceLock<Mutex<TcpStream>> = OnceLock::new();

/// Connects to the remote agent. Called once from the `ctor` constructor;
/// panics (taking the whole process down at startup, same as the original
/// source's `err(1, 0)` on a failed `connect2server`) if the connection
/// can't be made, since every hook in this crate is unusable without it.
pub fn connect(host: std::net::Ipv4Addr, port: u16) {
    let stream = TcpStream::connect((host, port))
        .unwrap_or_else(|err| panic!("failed to connect to remote agent at {host}:{port}: {err}"));
    CONNECTION
        .set(Mutex::new(stream))
        .unwrap_or_else(|_| panic!("connection already initialized"));
}

/// Sends one already-framed request and returns the already-framed reply,
/// holding the connection's lock for the whole exchange.
pub fn roundtrip(request_frame: &[u8]) -> Result<Vec<u8>, LayerError> {
    let conn = CONNECTION.get().ok_or(LayerError::NotConnected)?;
    let mut stream = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    frame::send_all(&mut *stream, request_frame)?;
    let reply = frame::recv_frame(&mut *stream)?;
    Ok(reply)
}
