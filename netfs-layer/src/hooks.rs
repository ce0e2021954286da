//! The ten `#[no_mangle] extern "C"` symbols spec.md §6 names, exported for
//! `cdylib` consumption by whatever `LD_PRELOAD`-style injector loads this
//! library (building and driving that injector is spec.md's explicit
//! non-goal and isn't done here — only the symbols it would need to find).
//!
//! Every hook is wrapped in [`crate::guard::with_hook_guard`]: on the
//! outermost call it runs our logic in [`crate::ops`], on any nested
//! re-entrant call (for example `tracing`'s own writer calling `write`
//! while we're already inside the `write` hook) it falls back to the real
//! primitive resolved in [`crate::original`].

use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};

use crate::guard::with_hook_guard;
use crate::{dirtree, ops, original};

unsafe fn cstr_or_empty<'a>(ptr: *const c_char) -> &'a CStr {
    if ptr.is_null() {
        CStr::from_bytes_with_nul(b"\0").unwrap()
    } else {
        CStr::from_ptr(ptr)
    }
}

/// Fixed-arity stand-in for libc's variadic `open(2)`; like every Rust
/// `LD_PRELOAD` shim, this assumes callers that omit `O_CREAT`'s mode
/// argument still leave a readable value in the third argument slot.
#[no_mangle]
pub unsafe extern "C" fn open(pathname: *const c_char, flags: c_int, mode: c_int) -> c_int {
    let path = cstr_or_empty(pathname);
    with_hook_guard(
        || original::orig_open()(pathname, flags, mode as libc::mode_t),
        || ops::open(path, flags, mode as u32) as c_int,
    )
}

#[no_mangle]
pub unsafe extern "C" fn close(fd: c_int) -> c_int {
    with_hook_guard(
        || original::orig_close()(fd),
        || ops::close(fd) as c_int,
    )
}

#[no_mangle]
pub unsafe extern "C" fn read(fildes: c_int, buf: *mut c_void, nbyte: usize) -> isize {
    with_hook_guard(
        || original::orig_read()(fildes, buf, nbyte),
        || ops::read(fildes, buf, nbyte) as isize,
    )
}

#[no_mangle]
pub unsafe extern "C" fn write(fd: c_int, buf: *const c_void, count: usize) -> isize {
    with_hook_guard(
        || original::orig_write()(fd, buf, count),
        || ops::write(fd, buf, count) as isize,
    )
}

#[no_mangle]
pub unsafe extern "C" fn lseek(fd: c_int, offset: i64, whence: c_int) -> i64 {
    with_hook_guard(
        || original::orig_lseek()(fd, offset, whence),
        || ops::lseek(fd, offset, whence),
    )
}

#[no_mangle]
pub unsafe extern "C" fn unlink(pathname: *const c_char) -> c_int {
    let path = cstr_or_empty(pathname);
    with_hook_guard(
        || original::orig_unlink()(pathname),
        || ops::unlink(path) as c_int,
    )
}

#[no_mangle]
pub unsafe extern "C" fn __xstat(ver: c_int, path: *const c_char, stat_buf: *mut libc::stat) -> c_int {
    let path_ref = cstr_or_empty(path);
    with_hook_guard(
        || original::orig_xstat()(ver, path, stat_buf),
        || ops::xstat(ver, path_ref, stat_buf) as c_int,
    )
}

#[no_mangle]
pub unsafe extern "C" fn getdirentries(
    fd: c_int,
    buf: *mut c_char,
    nbytes: usize,
    basep: *mut i64,
) -> isize {
    with_hook_guard(
        || original::orig_getdirentries()(fd, buf, nbytes, basep),
        || ops::getdirentries(fd, buf as *mut c_void, nbytes, basep) as isize,
    )
}

/// Unlike the other hooks, `getdirtree` never has a meaningful "original"
/// fallback: the nested-hook case here would mean we're already mid
/// roundtrip on this thread, which a guard-level bypass can't safely
/// service. We log and fail with `EBUSY` instead of risking deadlock on
/// [`crate::connection`]'s lock.
#[no_mangle]
pub unsafe extern "C" fn getdirtree(path: *const c_char) -> *mut dirtree::DirTreeNode {
    let path_ref = cstr_or_empty(path);
    with_hook_guard(
        || {
            tracing::warn!("getdirtree called re-entrantly; refusing to recurse");
            nix::errno::Errno::EBUSY.set();
            std::ptr::null_mut()
        },
        || match ops::getdirtree(path_ref) {
            Ok(tree) => dirtree::into_raw(tree),
            Err(errno) => {
                nix::errno::Errno::from_raw(errno).set();
                std::ptr::null_mut()
            }
        },
    )
}

#[no_mangle]
pub unsafe extern "C" fn freedirtree(dt: *mut dirtree::DirTreeNode) {
    dirtree::free_tree(dt);
}
