use netfs_protocol::file::{
    CloseRequest, GetEntryRequest, LseekRequest, OpenRequest, PathRequest, ReadRequest,
    StatRequest, UnlinkRequest, WriteRequest,
};
use netfs_protocol::{frame, Opcode};

use crate::error::AgentResult;
use crate::handlers;
use crate::session::SessionFiles;

/// Decodes one request body by its opcode, runs the matching handler, and
/// frames the reply ready to hand to [`frame::send_all`].
pub fn dispatch(opcode: Opcode, body: &[u8], session: &mut SessionFiles) -> AgentResult<Vec<u8>> {
    let reply_body = match opcode {
        Opcode::Open => handlers::open(OpenRequest::decode(body)?, session),
        Opcode::Close => handlers::close(CloseRequest::decode(body)?, session),
        Opcode::Read => handlers::read(ReadRequest::decode(body)?),
        Opcode::Write => handlers::write(WriteRequest::decode(body)?),
        Opcode::Lseek => handlers::lseek(LseekRequest::decode(body)?),
        Opcode::Stat => handlers::stat(StatRequest::decode(body)?),
        Opcode::Unlink => handlers::unlink(UnlinkRequest::decode(body)?),
        Opcode::DirTree => handlers::dirtree(PathRequest::decode(body)?),
        Opcode::GetEntry => handlers::get_entry(GetEntryRequest::decode(body)?),
    };
    Ok(frame::encode_frame(opcode, &reply_body))
}
