//! The FFI-shaped tree `getdirtree`/`freedirtree` hand back to the
//! application, matching the original source's `struct dirtreenode` layout
//! (seen in `mylib.c`'s `new_dirtreenode`/BFS-reconstruction code — the
//! `dirtree.h` header itself wasn't part of the retrieved sources).

use std::ffi::CString;
use std::os::raw::c_char;

#[repr(C)]
pub struct DirTreeNode {
    pub name: *mut c_char,
    pub num_subdirs: i32,
    pub subdirs: *mut *mut DirTreeNode,
}

/// Converts a decoded [`netfs_protocol::tree::DirTree`] into a heap-allocated
/// chain of C-compatible nodes the application will read directly and
/// eventually pass back to [`free_tree`].
pub fn into_raw(tree: netfs_protocol::tree::DirTree) -> *mut DirTreeNode {
    let name = CString::new(tree.name)
        .unwrap_or_else(|_| CString::new("?").unwrap())
        .into_raw();

    let mut subdir_ptrs: Vec<*mut DirTreeNode> =
        tree.children.into_iter().map(into_raw).collect();
    subdir_ptrs.shrink_to_fit();
    let num_subdirs = subdir_ptrs.len() as i32;
    let subdirs = if subdir_ptrs.is_empty() {
        std::ptr::null_mut()
    } else {
        let boxed = subdir_ptrs.into_boxed_slice();
        Box::into_raw(boxed) as *mut *mut DirTreeNode
    };

    Box::into_raw(Box::new(DirTreeNode {
        name,
        num_subdirs,
        subdirs,
    }))
}

/// Recursively frees a tree built by [`into_raw`]. `node` must either be
/// null or a pointer this module produced; never a node the application
/// constructed itself.
///
/// # Safety
/// `node` must be null or a valid `*mut DirTreeNode` previously returned by
/// [`into_raw`] (directly, or reached through its `subdirs` array), not yet
/// freed.
pub unsafe fn free_tree(node: *mut DirTreeNode) {
    if node.is_null() {
        return;
    }
    let boxed = Box::from_raw(node);
    drop(CString::from_raw(boxed.name));
    if !boxed.subdirs.is_null() {
        let children =
            Box::from_raw(std::slice::from_raw_parts_mut(boxed.subdirs, boxed.num_subdirs as usize));
        for child in children.iter() {
            free_tree(*child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netfs_protocol::tree::DirTree;

    #[test]
    fn round_trips_nested_tree_shape() {
        let tree = DirTree {
            name: "root".into(),
            children: vec![
                DirTree::leaf("a"),
                DirTree {
                    name: "b".into(),
                    children: vec![DirTree::leaf("c")],
                },
            ],
        };
        let raw = into_raw(tree);
        unsafe {
            assert_eq!((*raw).num_subdirs, 2);
            let subdirs = std::slice::from_raw_parts((*raw).subdirs, 2);
            assert_eq!((*subdirs[1]).num_subdirs, 1);
            free_tree(raw);
        }
    }

    #[test]
    fn leaf_has_null_subdirs_pointer() {
        let raw = into_raw(DirTree::leaf("lonely"));
        unsafe {
            assert_eq!((*raw).num_subdirs, 0);
            assert!((*raw).subdirs.is_null());
            free_tree(raw);
        }
    }
}
