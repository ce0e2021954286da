//! Framing and the integer-reply encoding (spec.md §3, §4.1).
//!
//! The first eight bytes of any frame are `{opcode: u32 LE, total_len: u32
//! LE}`, where `total_len` counts every byte of the frame including this
//! prefix. That's the only source of truth for message boundaries — no
//! delimiters, no out-of-band signaling (spec.md §4.1 "Framing rule").

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::{error::ProtocolError, opcode::Opcode};

pub const PREFIX_LEN: usize = 8;

/// Writes `opcode` and the frame's declared total length, then the body,
/// into a fresh buffer ready to hand to [`send_all`].
pub fn encode_frame(opcode: Opcode, body: &[u8]) -> Vec<u8> {
    let total_len = PREFIX_LEN + body.len();
    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u32_le(opcode.as_u32());
    buf.put_u32_le(total_len as u32);
    buf.put_slice(body);
    buf.to_vec()
}

/// Splits a full frame (prefix + body) already read off the wire into its
/// opcode and body slice.
pub fn split_frame(frame: &[u8]) -> Result<(Opcode, &[u8]), ProtocolError> {
    if frame.len() < PREFIX_LEN {
        return Err(ProtocolError::ShortBody {
            opcode: None,
            need: PREFIX_LEN,
            got: frame.len(),
        });
    }
    let mut header = &frame[..PREFIX_LEN];
    let raw_opcode = header.get_u32_le();
    let total_len = header.get_u32_le();
    if total_len as usize != frame.len() {
        return Err(ProtocolError::MalformedFrame {
            declared: total_len,
            actual: frame.len(),
        });
    }
    let opcode = Opcode::try_from(raw_opcode)?;
    Ok((opcode, &frame[PREFIX_LEN..]))
}

/// Writes every byte of `bytes`, looping on short writes.
///
/// spec.md §9: "The send path in the source does not loop on short writes; a
/// correct implementation must."
pub fn send_all(stream: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    stream.write_all(bytes)
}

/// Reads exactly one frame: the 8-byte prefix, then `total_len - 8` more
/// bytes, reassembling across however many underlying reads the transport
/// happens to hand back (spec.md §4.3).
pub fn recv_frame(stream: &mut impl Read) -> Result<Vec<u8>, ProtocolError> {
    let mut prefix = [0u8; PREFIX_LEN];
    read_exact_or_closed(stream, &mut prefix, true)?;

    let mut header = &prefix[..];
    let _opcode = header.get_u32_le();
    let total_len = header.get_u32_le() as usize;

    if total_len < PREFIX_LEN {
        return Err(ProtocolError::MalformedFrame {
            declared: total_len as u32,
            actual: PREFIX_LEN,
        });
    }

    let mut frame = vec![0u8; total_len];
    frame[..PREFIX_LEN].copy_from_slice(&prefix);
    read_exact_or_closed(stream, &mut frame[PREFIX_LEN..], false)?;

    Ok(frame)
}

/// Like [`Read::read_exact`], but distinguishes "closed before any byte of
/// this frame arrived" (a clean disconnect between requests) from "closed
/// partway through" (a broken peer), per spec.md §4.3.
fn read_exact_or_closed(
    stream: &mut impl Read,
    buf: &mut [u8],
    first_of_frame: bool,
) -> Result<(), ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..])?;
        if n == 0 {
            return if first_of_frame && filled == 0 {
                Err(ProtocolError::TransportClosed)
            } else {
                Err(ProtocolError::ShortFrame)
            };
        }
        filled += n;
    }
    Ok(())
}

/// Encodes a signed integer as ASCII decimal text, the legacy "integer
/// reply" used by `OPEN, CLOSE, WRITE, LSEEK, UNLINK` and `STAT`'s `state`
/// field (spec.md §3 "Integer reply", §9 open question — preserved for wire
/// compatibility rather than replaced with a fixed-width encoding).
pub fn encode_integer_reply(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Decodes an ASCII-decimal integer reply, parsing until the first
/// non-digit (after an optional leading `-`) or end of input, matching the
/// atoi-equivalent behavior spec.md §3 describes.
pub fn decode_integer_reply(body: &[u8]) -> i64 {
    let text = String::from_utf8_lossy(body);
    let mut end = 0;
    let mut chars = text.char_indices().peekable();
    if let Some((_, '-')) = chars.peek() {
        end = 1;
        chars.next();
    }
    for (i, c) in chars {
        if !c.is_ascii_digit() {
            break;
        }
        end = i + 1;
    }
    text[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_reply_round_trips() {
        for value in [0_i64, 1, -1, 6, -2, i64::from(i32::MAX), -(i32::MAX as i64)] {
            let encoded = encode_integer_reply(value);
            assert_eq!(decode_integer_reply(&encoded), value);
        }
    }

    #[test]
    fn integer_reply_stops_at_first_non_digit() {
        assert_eq!(decode_integer_reply(b"42garbage"), 42);
        assert_eq!(decode_integer_reply(b"-7trailing"), -7);
    }

    #[test]
    fn split_frame_rejects_length_mismatch() {
        let mut frame = encode_frame(Opcode::Close, &[1, 2, 3, 4]);
        frame.push(0xff);
        assert!(matches!(
            split_frame(&frame),
            Err(ProtocolError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn split_frame_rejects_unknown_opcode() {
        let mut frame = encode_frame(Opcode::Close, &[]);
        frame[0] = 99;
        assert!(matches!(
            split_frame(&frame),
            Err(ProtocolError::UnknownOpcode(99))
        ));
    }

    #[test]
    fn recv_frame_reassembles_across_short_reads() {
        let body = vec![7u8; 2000];
        let frame = encode_frame(Opcode::Read, &body);

        struct Choppy<'a> {
            data: &'a [u8],
            pos: usize,
        }
        impl Read for Choppy<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = (buf.len().min(self.data.len() - self.pos)).min(17);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }

        let mut reader = Choppy {
            data: &frame,
            pos: 0,
        };
        let received = recv_frame(&mut reader).unwrap();
        assert_eq!(received, frame);
    }

    #[test]
    fn recv_frame_reports_clean_eof() {
        struct Empty;
        impl Read for Empty {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Ok(0)
            }
        }
        assert!(matches!(
            recv_frame(&mut Empty),
            Err(ProtocolError::TransportClosed)
        ));
    }

    #[test]
    fn recv_frame_reports_short_frame_on_mid_frame_eof() {
        let frame = encode_frame(Opcode::Read, &[1, 2, 3, 4]);
        struct Truncated<'a> {
            data: &'a [u8],
            pos: usize,
        }
        impl Read for Truncated<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.pos >= self.data.len() {
                    return Ok(0);
                }
                let n = buf.len().min(self.data.len() - self.pos).min(3);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }
        let mut reader = Truncated {
            data: &frame[..frame.len() - 2],
            pos: 0,
        };
        assert!(matches!(
            recv_frame(&mut reader),
            Err(ProtocolError::ShortFrame)
        ));
    }
}
