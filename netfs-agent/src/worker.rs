use std::net::TcpStream;

use netfs_protocol::frame;

use crate::dispatch::dispatch;
use crate::session::SessionFiles;

/// Serves one client connection until it disconnects or sends something we
/// can't parse. Runs on its own thread (spec.md §9 REDESIGN FLAG: threads
/// instead of `fork`); the `SessionFiles` this function owns closes every
/// descriptor the session opened when the function returns, standing in for
/// the process-exit cleanup `fork` gave the original implementation for
/// free.
pub fn serve(mut stream: TcpStream, peer: std::net::SocketAddr) {
    let mut session = SessionFiles::new();

    loop {
        let frame = match frame::recv_frame(&mut stream) {
            Ok(frame) => frame,
            Err(netfs_protocol::ProtocolError::TransportClosed) => {
                tracing::debug!(%peer, "client disconnected");
                break;
            }
            Err(err) => {
                tracing::warn!(%peer, %err, "ending session on transport error");
                break;
            }
        };

        let (opcode, body) = match frame::split_frame(&frame) {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(%peer, %err, "ending session on malformed frame");
                break;
            }
        };

        let reply = match dispatch(opcode, body, &mut session) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(%peer, ?opcode, %err, "ending session on handler error");
                break;
            }
        };

        if let Err(err) = frame::send_all(&mut stream, &reply) {
            tracing::warn!(%peer, %err, "ending session on send failure");
            break;
        }
    }
}
