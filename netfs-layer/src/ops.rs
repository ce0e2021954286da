//! The actual hook logic, one function per primitive, separated from the
//! `extern "C"` entry points in [`crate::hooks`] so the marshalling logic
//! can be unit tested without calling through raw FFI.
//!
//! Every function here implements spec.md §4.2's fd-namespace check: a
//! descriptor below [`netfs_protocol::OFFSET`] names something this host
//! opened itself (stdio, a socket, a file some other, unhooked path
//! produced) and passes straight through to the real primitive; everything
//! else names an open file on the remote agent and goes over the wire.

use std::ffi::CStr;
use std::os::raw::{c_int, c_void};

use netfs_protocol::file::{
    CloseRequest, GetEntryRequest, LseekRequest, OpenRequest, PathRequest, ReadRequest,
    StatRequest, UnlinkRequest, WriteRequest,
};
use netfs_protocol::tree::DirTreeWire;
use netfs_protocol::{frame, Opcode, OFFSET};

use crate::connection::roundtrip;
use crate::error::LayerError;
use crate::original;

fn fail(errno: i32) -> i64 {
    nix::errno::Errno::from_raw(errno).set();
    -1
}

fn fail_from_layer_error(err: LayerError) -> i64 {
    tracing::warn!(%err, "remote call failed");
    fail(err.as_errno())
}

pub fn is_remote_fd(fd: c_int) -> bool {
    i64::from(fd) >= OFFSET as i64
}

fn to_remote_fd(fd: c_int) -> i32 {
    (i64::from(fd) - OFFSET as i64) as i32
}

fn roundtrip_integer_reply(opcode: Opcode, body: &[u8]) -> i64 {
    let request_frame = frame::encode_frame(opcode, body);
    match roundtrip(&request_frame) {
        Ok(reply) => match frame::split_frame(&reply) {
            Ok((_, reply_body)) => {
                let value = frame::decode_integer_reply(reply_body);
                if value < 0 {
                    fail((-value) as i32)
                } else {
                    value
                }
            }
            Err(err) => fail_from_layer_error(LayerError::Protocol(err)),
        },
        Err(err) => fail_from_layer_error(err),
    }
}

pub fn open(path: &CStr, flags: c_int, mode: u32) -> i64 {
    let req = OpenRequest {
        flags,
        mode,
        path: path.to_owned(),
    };
    roundtrip_integer_reply(Opcode::Open, &req.encode())
}

pub unsafe fn close(fd: c_int) -> i64 {
    if !is_remote_fd(fd) {
        return original::orig_close()(fd) as i64;
    }
    let req = CloseRequest {
        fd: to_remote_fd(fd),
    };
    roundtrip_integer_reply(Opcode::Close, &req.encode())
}

pub unsafe fn read(fd: c_int, buf: *mut c_void, nbyte: usize) -> i64 {
    if !is_remote_fd(fd) {
        return original::orig_read()(fd, buf, nbyte) as i64;
    }
    let req = ReadRequest {
        fd: to_remote_fd(fd),
        nbyte: nbyte as u64,
    };
    let request_frame = frame::encode_frame(Opcode::Read, &req.encode());
    match roundtrip(&request_frame) {
        Ok(reply) => match frame::split_frame(&reply)
            .map_err(LayerError::from)
            .and_then(|(_, b)| netfs_protocol::file::ReadReply::decode(b).map_err(LayerError::from))
        {
            Ok(reply) if reply.read_num >= 0 => {
                std::ptr::copy_nonoverlapping(
                    reply.data.as_ptr(),
                    buf as *mut u8,
                    reply.data.len(),
                );
                reply.read_num as i64
            }
            Ok(reply) => fail((-reply.read_num) as i32),
            Err(err) => fail_from_layer_error(err),
        },
        Err(err) => fail_from_layer_error(err),
    }
}

pub unsafe fn write(fd: c_int, buf: *const c_void, count: usize) -> i64 {
    if !is_remote_fd(fd) {
        return original::orig_write()(fd, buf, count) as i64;
    }
    let data = std::slice::from_raw_parts(buf as *const u8, count).to_vec();
    let req = WriteRequest {
        fd: to_remote_fd(fd),
        data,
    };
    roundtrip_integer_reply(Opcode::Write, &req.encode())
}

pub unsafe fn lseek(fd: c_int, offset: i64, whence: c_int) -> i64 {
    if !is_remote_fd(fd) {
        return original::orig_lseek()(fd, offset, whence) as i64;
    }
    let req = LseekRequest {
        fd: to_remote_fd(fd),
        offset,
        whence,
    };
    roundtrip_integer_reply(Opcode::Lseek, &req.encode())
}

pub unsafe fn unlink(path: &CStr) -> i64 {
    let req = UnlinkRequest {
        path: path.to_owned(),
    };
    roundtrip_integer_reply(Opcode::Unlink, &req.encode())
}

/// Returns `0` on success after writing `sizeof(struct stat)` bytes into
/// `stat_buf`, or `-1` with `errno` set, matching `__xstat`'s contract.
pub unsafe fn xstat(ver: c_int, path: &CStr, stat_buf: *mut libc::stat) -> i64 {
    let req = StatRequest {
        ver,
        path: path.to_owned(),
    };
    let request_frame = frame::encode_frame(Opcode::Stat, &req.encode());
    match roundtrip(&request_frame) {
        Ok(reply) => match frame::split_frame(&reply)
            .map_err(LayerError::from)
            .and_then(|(_, b)| netfs_protocol::file::StatReply::decode(b).map_err(LayerError::from))
        {
            Ok(reply) if reply.state >= 0 => {
                let expected = std::mem::size_of::<libc::stat>();
                if reply.stat.len() != expected {
                    return fail(libc::EIO);
                }
                std::ptr::copy_nonoverlapping(
                    reply.stat.as_ptr(),
                    stat_buf as *mut u8,
                    expected,
                );
                0
            }
            Ok(reply) => fail((-reply.state) as i32),
            Err(err) => fail_from_layer_error(err),
        },
        Err(err) => fail_from_layer_error(err),
    }
}

pub unsafe fn getdirentries(fd: c_int, buf: *mut c_void, nbytes: usize, basep: *mut i64) -> i64 {
    if !is_remote_fd(fd) {
        return original::orig_getdirentries()(fd, buf as *mut _, nbytes, basep) as i64;
    }
    let req = GetEntryRequest {
        fd: to_remote_fd(fd),
        nbyte: nbytes as u64,
        basep: if basep.is_null() { 0 } else { *basep },
    };
    let request_frame = frame::encode_frame(Opcode::GetEntry, &req.encode());
    match roundtrip(&request_frame) {
        Ok(reply) => match frame::split_frame(&reply)
            .map_err(LayerError::from)
            .and_then(|(_, b)| {
                netfs_protocol::file::GetEntryReply::decode(b).map_err(LayerError::from)
            })
        {
            Ok(reply) if reply.read_num >= 0 => {
                std::ptr::copy_nonoverlapping(
                    reply.data.as_ptr(),
                    buf as *mut u8,
                    reply.data.len(),
                );
                if !basep.is_null() {
                    *basep = reply.basep;
                }
                reply.read_num as i64
            }
            Ok(reply) => fail((-reply.read_num) as i32),
            Err(err) => fail_from_layer_error(err),
        },
        Err(err) => fail_from_layer_error(err),
    }
}

/// Requests the remote tree and decodes it into our own owned
/// [`netfs_protocol::tree::DirTree`]; [`crate::dirtree`] converts that into
/// the FFI node shape `getdirtree`'s caller expects.
pub fn getdirtree(path: &CStr) -> Result<netfs_protocol::tree::DirTree, i32> {
    let req = PathRequest {
        path: path.to_owned(),
    };
    let request_frame = frame::encode_frame(Opcode::DirTree, &req.encode());
    let reply = roundtrip(&request_frame).map_err(|err| err.as_errno())?;
    let (_, body) = frame::split_frame(&reply).map_err(|_| libc::EIO)?;
    match DirTreeWire::decode(body).map_err(|_| libc::EIO)? {
        DirTreeWire::Tree(tree) => Ok(tree),
        DirTreeWire::Error(errno) => Err(errno),
    }
}
