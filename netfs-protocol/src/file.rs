//! Per-opcode request/reply bodies (spec.md §3 "Request and reply bodies").
//!
//! These are pure encode/decode functions over already-framed bodies (the
//! prefix is [`crate::frame`]'s job); nothing here touches a socket.

use std::ffi::CString;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;

fn encode_path(buf: &mut BytesMut, path: &CString) {
    let bytes = path.as_bytes_with_nul();
    buf.put_i32_le(bytes.len() as i32);
    buf.put_slice(bytes);
}

fn decode_path(buf: &mut impl Buf) -> Result<CString, ProtocolError> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::ShortBody {
            opcode: None,
            need: 4,
            got: buf.remaining(),
        });
    }
    let path_len = buf.get_i32_le();
    if path_len < 1 || path_len as usize > buf.remaining() {
        return Err(ProtocolError::ShortBody {
            opcode: None,
            need: path_len.max(0) as usize,
            got: buf.remaining(),
        });
    }
    let mut raw = vec![0u8; path_len as usize];
    buf.copy_to_slice(&mut raw);
    if raw.pop() != Some(0) {
        return Err(ProtocolError::EmbeddedNul);
    }
    CString::new(raw).map_err(|_| ProtocolError::EmbeddedNul)
}

/// `{flags: i32, mode: u32, path_len: i32, path: bytes}` (spec.md §3 OPEN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub flags: i32,
    pub mode: u32,
    pub path: CString,
}

impl OpenRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(8 + self.path.as_bytes_with_nul().len());
        buf.put_i32_le(self.flags);
        buf.put_u32_le(self.mode);
        encode_path(&mut buf, &self.path);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 8 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Open),
                need: 8,
                got: body.remaining(),
            });
        }
        let flags = body.get_i32_le();
        let mode = body.get_u32_le();
        let path = decode_path(&mut body)?;
        Ok(Self { flags, mode, path })
    }
}

/// `{fd: i32}` (spec.md §3 CLOSE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseRequest {
    pub fd: i32,
}

impl CloseRequest {
    pub fn encode(&self) -> Vec<u8> {
        self.fd.to_le_bytes().to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 4 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Close),
                need: 4,
                got: body.remaining(),
            });
        }
        Ok(Self {
            fd: body.get_i32_le(),
        })
    }
}

/// `{fd: i32, nbyte: u64}` (spec.md §3 READ).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub fd: i32,
    pub nbyte: u64,
}

impl ReadRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(12);
        buf.put_i32_le(self.fd);
        buf.put_u64_le(self.nbyte);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 12 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Read),
                need: 12,
                got: body.remaining(),
            });
        }
        Ok(Self {
            fd: body.get_i32_le(),
            nbyte: body.get_u64_le(),
        })
    }
}

/// `{read_num: i32, data: bytes(read_num)}`, or just `{read_num: i32 < 0}` on
/// error (spec.md §3 READ reply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    pub read_num: i32,
    pub data: Vec<u8>,
}

impl ReadReply {
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            read_num: data.len() as i32,
            data,
        }
    }

    pub fn err(errno: i32) -> Self {
        Self {
            read_num: -errno.abs(),
            data: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + self.data.len());
        buf.put_i32_le(self.read_num);
        if self.read_num >= 0 {
            buf.put_slice(&self.data);
        }
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 4 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Read),
                need: 4,
                got: body.remaining(),
            });
        }
        let read_num = body.get_i32_le();
        let data = if read_num >= 0 {
            if body.remaining() < read_num as usize {
                return Err(ProtocolError::ShortBody {
                    opcode: Some(crate::opcode::Opcode::Read),
                    need: read_num as usize,
                    got: body.remaining(),
                });
            }
            let mut data = vec![0u8; read_num as usize];
            body.copy_to_slice(&mut data);
            data
        } else {
            Vec::new()
        };
        Ok(Self { read_num, data })
    }
}

/// `{fd: i32, count: u64, data: bytes(count)}` (spec.md §3 WRITE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub fd: i32,
    pub data: Vec<u8>,
}

impl WriteRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(12 + self.data.len());
        buf.put_i32_le(self.fd);
        buf.put_u64_le(self.data.len() as u64);
        buf.put_slice(&self.data);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 12 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Write),
                need: 12,
                got: body.remaining(),
            });
        }
        let fd = body.get_i32_le();
        let count = body.get_u64_le() as usize;
        if body.remaining() < count {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Write),
                need: count,
                got: body.remaining(),
            });
        }
        let mut data = vec![0u8; count];
        body.copy_to_slice(&mut data);
        Ok(Self { fd, data })
    }
}

/// `{fd: i32, offset: i64, whence: i32}` (spec.md §3 LSEEK).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LseekRequest {
    pub fd: i32,
    pub offset: i64,
    pub whence: i32,
}

impl LseekRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(16);
        buf.put_i32_le(self.fd);
        buf.put_i64_le(self.offset);
        buf.put_i32_le(self.whence);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 16 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Lseek),
                need: 16,
                got: body.remaining(),
            });
        }
        Ok(Self {
            fd: body.get_i32_le(),
            offset: body.get_i64_le(),
            whence: body.get_i32_le(),
        })
    }
}

/// `{ver: i32, path_len: i32, path: bytes}` (spec.md §3 STAT request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRequest {
    pub ver: i32,
    pub path: CString,
}

impl StatRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + 4 + self.path.as_bytes_with_nul().len());
        buf.put_i32_le(self.ver);
        encode_path(&mut buf, &self.path);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 4 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Stat),
                need: 4,
                got: body.remaining(),
            });
        }
        let ver = body.get_i32_le();
        let path = decode_path(&mut body)?;
        Ok(Self { ver, path })
    }
}

/// `{state: i32, stat: bytes(sizeof(host stat))}`, `stat` absent on error
/// (spec.md §3 STAT reply). See SPEC_FULL.md's "Open Questions" section for
/// why this stays binary rather than joining the ASCII-decimal group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatReply {
    pub state: i32,
    pub stat: Vec<u8>,
}

impl StatReply {
    pub fn ok(stat: Vec<u8>) -> Self {
        Self { state: 0, stat }
    }

    pub fn err(errno: i32) -> Self {
        Self {
            state: -errno.abs(),
            stat: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + self.stat.len());
        buf.put_i32_le(self.state);
        if self.state >= 0 {
            buf.put_slice(&self.stat);
        }
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 4 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::Stat),
                need: 4,
                got: body.remaining(),
            });
        }
        let state = body.get_i32_le();
        let stat = if state >= 0 {
            body.chunk().to_vec()
        } else {
            Vec::new()
        };
        Ok(Self { state, stat })
    }
}

/// `{path_len: i32, path: bytes}` (spec.md §3 UNLINK).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlinkRequest {
    pub path: CString,
}

impl UnlinkRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + self.path.as_bytes_with_nul().len());
        encode_path(&mut buf, &self.path);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        let path = decode_path(&mut body)?;
        Ok(Self { path })
    }
}

/// `{fd: i32, nbyte: u64, basep: i64}` (spec.md §3 GETENTRY request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetEntryRequest {
    pub fd: i32,
    pub nbyte: u64,
    pub basep: i64,
}

impl GetEntryRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(20);
        buf.put_i32_le(self.fd);
        buf.put_u64_le(self.nbyte);
        buf.put_i64_le(self.basep);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 20 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::GetEntry),
                need: 20,
                got: body.remaining(),
            });
        }
        Ok(Self {
            fd: body.get_i32_le(),
            nbyte: body.get_u64_le(),
            basep: body.get_i64_le(),
        })
    }
}

/// `{read_num: i32, basep: i64, data: bytes(read_num)}`, or just
/// `{read_num: i32 < 0, basep: i64}` on error (spec.md §3 GETENTRY reply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEntryReply {
    pub read_num: i32,
    pub basep: i64,
    pub data: Vec<u8>,
}

impl GetEntryReply {
    pub fn ok(data: Vec<u8>, basep: i64) -> Self {
        Self {
            read_num: data.len() as i32,
            basep,
            data,
        }
    }

    pub fn err(errno: i32, basep: i64) -> Self {
        Self {
            read_num: -errno.abs(),
            basep,
            data: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(12 + self.data.len());
        buf.put_i32_le(self.read_num);
        buf.put_i64_le(self.basep);
        if self.read_num >= 0 {
            buf.put_slice(&self.data);
        }
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        if body.remaining() < 12 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::GetEntry),
                need: 12,
                got: body.remaining(),
            });
        }
        let read_num = body.get_i32_le();
        let basep = body.get_i64_le();
        let data = if read_num >= 0 {
            body.chunk().to_vec()
        } else {
            Vec::new()
        };
        Ok(Self {
            read_num,
            basep,
            data,
        })
    }
}

/// `{path_len: i32, path: bytes}` — shared by UNLINK and the DIRTREE request
/// (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRequest {
    pub path: CString,
}

impl PathRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + self.path.as_bytes_with_nul().len());
        encode_path(&mut buf, &self.path);
        buf.to_vec()
    }

    pub fn decode(mut body: &[u8]) -> Result<Self, ProtocolError> {
        let path = decode_path(&mut body)?;
        Ok(Self { path })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0o644, "/tmp/x")]
    #[case(libc::O_CREAT, 0o600, "/a/b/c")]
    fn open_request_round_trips(#[case] flags: i32, #[case] mode: u32, #[case] path: &str) {
        let req = OpenRequest {
            flags,
            mode,
            path: CString::new(path).unwrap(),
        };
        let decoded = OpenRequest::decode(&req.encode()).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn read_reply_error_path_carries_no_data() {
        let reply = ReadReply::err(libc::ENOENT);
        let decoded = ReadReply::decode(&reply.encode()).unwrap();
        assert_eq!(decoded.read_num, -libc::ENOENT);
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn read_reply_zero_byte_read_round_trips() {
        let reply = ReadReply::ok(Vec::new());
        let decoded = ReadReply::decode(&reply.encode()).unwrap();
        assert_eq!(decoded.read_num, 0);
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn write_request_round_trips_with_binary_payload() {
        let req = WriteRequest {
            fd: 7,
            data: vec![0, 1, 2, 255, 254, 0, 9],
        };
        let decoded = WriteRequest::decode(&req.encode()).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn decode_path_rejects_embedded_nul() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(5);
        buf.put_slice(b"a\0b\0\0");
        assert!(matches!(
            decode_path(&mut buf),
            Err(ProtocolError::EmbeddedNul)
        ));
    }

    #[test]
    fn stat_reply_round_trips_ok_and_err() {
        let ok = StatReply::ok(vec![1, 2, 3, 4]);
        assert_eq!(StatReply::decode(&ok.encode()).unwrap(), ok);

        let err = StatReply::err(libc::ENOENT);
        let decoded = StatReply::decode(&err.encode()).unwrap();
        assert_eq!(decoded.state, -libc::ENOENT);
        assert!(decoded.stat.is_empty());
    }

    #[test]
    fn get_entry_reply_round_trips() {
        let reply = GetEntryReply::ok(vec![9; 64], 128);
        let decoded = GetEntryReply::decode(&reply.encode()).unwrap();
        assert_eq!(reply, decoded);
    }
}
