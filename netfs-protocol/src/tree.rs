//! Directory-tree marshalling (spec.md §4.5).
//!
//! An owned, finite, ordered rose tree, serialized breadth-first into a
//! single contiguous buffer: the root record first, then every child of the
//! root left-to-right, then every grandchild grouped by parent, and so on.
//! Each record carries its own child count so a reader can allocate child
//! slots before consuming the grandchildren that fill them.

use std::collections::VecDeque;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;

/// An owned, finite directory tree. Dropping the root recursively drops
/// every descendant — no arena, no manual free function needed in Rust
/// (spec.md §9 "owned finite tree that can be freed with one call").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTree {
    pub name: String,
    pub children: Vec<DirTree>,
}

impl DirTree {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Walks the real filesystem under `root`, depth-first, building an
    /// owned tree of directory names. A subdirectory that can't be entered
    /// (permission denied, or removed by a racing process) is skipped rather
    /// than aborting the whole walk; `root` itself failing to open is the
    /// only error this returns.
    pub fn walk(root: &Path) -> std::io::Result<Self> {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned());

        let mut children = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            if let Ok(subtree) = Self::walk(&entry.path()) {
                children.push(subtree);
            }
        }
        Ok(Self { name, children })
    }

    /// Total bytes this tree's BFS serialization will take, computed with one
    /// depth-first walk (spec.md §4.5 "Total-length precomputation").
    fn wire_len(&self) -> usize {
        let mut total = record_len(&self.name);
        for child in &self.children {
            total += child.wire_len();
        }
        total
    }

    /// Breadth-first linearization into a single buffer, per spec.md §4.5.
    pub fn serialize_bfs(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        write_record(&mut buf, &self.name, self.children.len());

        let mut queue: VecDeque<&DirTree> = self.children.iter().collect();
        while let Some(node) = queue.pop_front() {
            write_record(&mut buf, &node.name, node.children.len());
            queue.extend(node.children.iter());
        }
        buf.to_vec()
    }

    /// Reconstructs a tree from a buffer produced by [`Self::serialize_bfs`].
    ///
    /// Reads records into a flat arena in the order they appear (which is
    /// BFS order by construction), remembering each node's parent, then
    /// folds the arena back into an owned tree. This sidesteps holding
    /// mutable references to several tree levels at once while still
    /// following the reader algorithm spec.md §4.5 describes: a queue of
    /// nodes whose child slots are allocated but not yet filled.
    pub fn deserialize_bfs(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = bytes;
        let (root_name, root_subdirs) = read_record(&mut buf)?;

        // arena[i] = (name, children indices)
        let mut arena: Vec<(String, Vec<usize>)> = vec![(root_name, Vec::with_capacity(root_subdirs))];
        let mut pending: VecDeque<(usize, usize)> = VecDeque::new(); // (node index, remaining children to allocate slots for)
        pending.push_back((0, root_subdirs));

        while let Some((parent_idx, num_children)) = pending.pop_front() {
            for _ in 0..num_children {
                let (name, subdirs) = read_record(&mut buf)?;
                let new_idx = arena.len();
                arena.push((name, Vec::with_capacity(subdirs)));
                arena[parent_idx].1.push(new_idx);
                pending.push_back((new_idx, subdirs));
            }
        }

        Ok(build_tree(&arena, 0))
    }
}

fn build_tree(arena: &[(String, Vec<usize>)], idx: usize) -> DirTree {
    let (name, child_indices) = &arena[idx];
    DirTree {
        name: name.clone(),
        children: child_indices.iter().map(|&i| build_tree(arena, i)).collect(),
    }
}

fn record_len(name: &str) -> usize {
    // num_subdirs: i32, name_len: i32, name bytes including the NUL.
    4 + 4 + name.len() + 1
}

fn write_record(buf: &mut BytesMut, name: &str, num_subdirs: usize) {
    let name_with_nul_len = name.len() + 1;
    buf.put_i32_le(num_subdirs as i32);
    buf.put_i32_le(name_with_nul_len as i32);
    buf.put_slice(name.as_bytes());
    buf.put_u8(0);
}

fn read_record(buf: &mut &[u8]) -> Result<(String, usize), ProtocolError> {
    if buf.remaining() < 8 {
        return Err(ProtocolError::ShortBody {
            opcode: Some(crate::opcode::Opcode::DirTree),
            need: 8,
            got: buf.remaining(),
        });
    }
    let num_subdirs = buf.get_i32_le();
    let name_len = buf.get_i32_le();
    if num_subdirs < 0 {
        return Err(ProtocolError::MalformedFrame {
            declared: num_subdirs as u32,
            actual: 0,
        });
    }
    if name_len < 1 || name_len as usize > buf.remaining() {
        return Err(ProtocolError::ShortBody {
            opcode: Some(crate::opcode::Opcode::DirTree),
            need: name_len.max(0) as usize,
            got: buf.remaining(),
        });
    }
    let mut raw = vec![0u8; name_len as usize];
    buf.copy_to_slice(&mut raw);
    raw.pop(); // drop the terminating NUL
    let name = String::from_utf8(raw).map_err(|_| ProtocolError::EmbeddedNul)?;
    Ok((name, num_subdirs as usize))
}

/// The DIRTREE reply as seen at the codec boundary: either a tree, or the
/// error encoding described in spec.md §4.5 ("a single record with
/// `num_subdirs = -errno` and `name_len = 0`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirTreeWire {
    Tree(DirTree),
    Error(i32),
}

impl DirTreeWire {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Tree(tree) => tree.serialize_bfs(),
            Self::Error(errno) => {
                let mut buf = BytesMut::with_capacity(8);
                buf.put_i32_le(-errno.abs());
                buf.put_i32_le(0);
                buf.to_vec()
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut peek = bytes;
        if peek.remaining() < 4 {
            return Err(ProtocolError::ShortBody {
                opcode: Some(crate::opcode::Opcode::DirTree),
                need: 4,
                got: peek.remaining(),
            });
        }
        let num_subdirs = peek.get_i32_le();
        if num_subdirs < 0 {
            return Ok(Self::Error(-num_subdirs));
        }
        DirTree::deserialize_bfs(bytes).map(Self::Tree)
    }
}

/// The DIRTREE request is a bare path, same shape as UNLINK's.
pub type DirTreeRequest = crate::file::PathRequest;
