//! One function per opcode: decode the already-framed request, perform the
//! real syscall on this host, and return the encoded reply body. None of
//! these touch the socket; `dispatch` wraps the result in a frame.

use std::os::unix::io::RawFd;

use netfs_protocol::file::{
    CloseRequest, GetEntryReply, GetEntryRequest, LseekRequest, OpenRequest, PathRequest,
    ReadReply, ReadRequest, StatReply, StatRequest, UnlinkRequest, WriteRequest,
};
use netfs_protocol::frame::encode_integer_reply;
use netfs_protocol::tree::{DirTree, DirTreeWire};
use netfs_protocol::OFFSET;

use crate::session::SessionFiles;

fn errno() -> i32 {
    nix::errno::Errno::last() as i32
}

fn to_local_fd(wire_fd: i32) -> RawFd {
    (wire_fd as i64 - OFFSET as i64) as RawFd
}

pub fn open(req: OpenRequest, session: &mut SessionFiles) -> Vec<u8> {
    let fd = unsafe { libc::open(req.path.as_ptr(), req.flags, req.mode as libc::mode_t) };
    let reply = if fd < 0 {
        -(errno() as i64)
    } else {
        session.track(fd);
        fd as i64 + OFFSET as i64
    };
    encode_integer_reply(reply)
}

pub fn close(req: CloseRequest, session: &mut SessionFiles) -> Vec<u8> {
    let fd = to_local_fd(req.fd);
    let state = unsafe { libc::close(fd) };
    let reply = if state < 0 {
        -(errno() as i64)
    } else {
        session.forget(fd);
        0
    };
    encode_integer_reply(reply)
}

pub fn read(req: ReadRequest) -> Vec<u8> {
    let fd = to_local_fd(req.fd);
    let mut buf = vec![0u8; req.nbyte as usize];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    let reply = if n < 0 {
        ReadReply::err(errno())
    } else {
        buf.truncate(n as usize);
        ReadReply::ok(buf)
    };
    reply.encode()
}

pub fn write(req: WriteRequest) -> Vec<u8> {
    let fd = to_local_fd(req.fd);
    let n = unsafe { libc::write(fd, req.data.as_ptr() as *const libc::c_void, req.data.len()) };
    let reply = if n < 0 { -(errno() as i64) } else { n as i64 };
    encode_integer_reply(reply)
}

pub fn lseek(req: LseekRequest) -> Vec<u8> {
    let fd = to_local_fd(req.fd);
    let offset = unsafe { libc::lseek(fd, req.offset, req.whence) };
    let reply = if offset < 0 {
        -(errno() as i64)
    } else {
        offset as i64
    };
    encode_integer_reply(reply)
}

pub fn unlink(req: UnlinkRequest) -> Vec<u8> {
    let state = unsafe { libc::unlink(req.path.as_ptr()) };
    let reply = if state < 0 { -(errno() as i64) } else { 0 };
    encode_integer_reply(reply)
}

/// `req.ver` names the glibc `__xstat` ABI version the client was compiled
/// against; on this host `libc::stat` already produces the current struct
/// layout, so the version number has nothing left to select between.
pub fn stat(req: StatRequest) -> Vec<u8> {
    let mut raw: libc::stat = unsafe { std::mem::zeroed() };
    let state = unsafe { libc::stat(req.path.as_ptr(), &mut raw) };
    let reply = if state < 0 {
        StatReply::err(errno())
    } else {
        let bytes = unsafe {
            std::slice::from_raw_parts(
                &raw as *const libc::stat as *const u8,
                std::mem::size_of::<libc::stat>(),
            )
        }
        .to_vec();
        StatReply::ok(bytes)
    };
    reply.encode()
}

pub fn dirtree(req: PathRequest) -> Vec<u8> {
    let path = std::path::Path::new(req.path.to_str().unwrap_or_default());
    let wire = match DirTree::walk(path) {
        Ok(tree) => DirTreeWire::Tree(tree),
        Err(e) => DirTreeWire::Error(e.raw_os_error().unwrap_or(libc::EIO)),
    };
    wire.encode()
}

/// Linux has no `getdirentries`; the closest available primitive is the raw
/// `getdents64` syscall, with `basep` synthesized from the directory fd's
/// seek offset afterward (see SPEC_FULL.md's Open Questions).
pub fn get_entry(req: GetEntryRequest) -> Vec<u8> {
    let fd = to_local_fd(req.fd);
    let mut buf = vec![0u8; req.nbyte as usize];
    let read_num =
        unsafe { libc::syscall(libc::SYS_getdents64, fd, buf.as_mut_ptr(), buf.len()) };
    let reply = if read_num < 0 {
        GetEntryReply::err(errno(), req.basep)
    } else {
        let basep = unsafe { libc::lseek(fd, 0, libc::SEEK_CUR) };
        buf.truncate(read_num as usize);
        GetEntryReply::ok(buf, basep)
    };
    reply.encode()
}
