//! Resolves the real libc primitives once, at constructor time, via
//! `dlsym(RTLD_NEXT, ...)` (spec.md §4.2's "pass-through" requirement). The
//! raw original source stored these in plain mutable globals; here each one
//! lives in its own `OnceLock`, set once by [`init`] and read by every hook
//! and by the re-entrancy guard's fallback path afterward.

use std::ffi::c_void;
use std::sync::OnceLock;

use libc::{c_char, c_int, mode_t, off_t, size_t, ssize_t};

pub type OpenFn = unsafe extern "C" fn(*const c_char, c_int, mode_t) -> c_int;
pub type CloseFn = unsafe extern "C" fn(c_int) -> c_int;
pub type ReadFn = unsafe extern "C" fn(c_int, *mut c_void, size_t) -> ssize_t;
pub type WriteFn = unsafe extern "C" fn(c_int, *const c_void, size_t) -> ssize_t;
pub type LseekFn = unsafe extern "C" fn(c_int, off_t, c_int) -> off_t;
pub type XstatFn = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat) -> c_int;
pub type UnlinkFn = unsafe extern "C" fn(*const c_char) -> c_int;
pub type GetdirentriesFn = unsafe extern "C" fn(c_int, *mut c_char, size_t, *mut off_t) -> ssize_t;

static ORIG_OPEN: OnceLock<OpenFn> = OnceLock::new();
static ORIG_CLOSE: OnceLock<CloseFn> = OnceLock::new();
static ORIG_READ: OnceLock<ReadFn> = OnceLock::new();
static ORIG_WRITE: OnceLock<WriteFn> = OnceLock::new();
static ORIG_LSEEK: OnceLock<LseekFn> = OnceLock::new();
static ORIG_XSTAT: OnceLock<XstatFn> = OnceLock::new();
static ORIG_UNLINK: OnceLock<UnlinkFn> = OnceLock::new();
static ORIG_GETDIRENTRIES: OnceLock<GetdirentriesFn> = OnceLock::new();

unsafe fn resolve<F: Copy>(name: &str) -> F {
    let c_name = std::ffi::CString::new(name).expect("hook name has no interior NUL");
    let sym = libc::dlsym(libc::RTLD_NEXT, c_name.as_ptr());
    assert!(
        !sym.is_null(),
        "dlsym(RTLD_NEXT, {name:?}) returned NULL — no next implementation in the chain"
    );
    // SAFETY: caller guarantees `F` is a function-pointer-shaped type with
    // the same ABI as the symbol being resolved.
    std::mem::transmute_copy::<*mut c_void, F>(&sym)
}

/// Resolves every original primitive this crate hooks. Must run before any
/// hook can be called; `ctor`-invoked exactly once at load time.
pub fn init() {
    unsafe {
        let _ = ORIG_OPEN.set(resolve::<OpenFn>("open"));
        let _ = ORIG_CLOSE.set(resolve::<CloseFn>("close"));
        let _ = ORIG_READ.set(resolve::<ReadFn>("read"));
        let _ = ORIG_WRITE.set(resolve::<WriteFn>("write"));
        let _ = ORIG_LSEEK.set(resolve::<LseekFn>("lseek"));
        let _ = ORIG_XSTAT.set(resolve::<XstatFn>("__xstat"));
        let _ = ORIG_UNLINK.set(resolve::<UnlinkFn>("unlink"));
        let _ = ORIG_GETDIRENTRIES.set(resolve::<GetdirentriesFn>("getdirentries"));
    }
}

macro_rules! accessor {
    ($name:ident, $cell:ident, $ty:ty) => {
        pub fn $name() -> $ty {
            *$cell.get().expect("original::init was not called")
        }
    };
}

accessor!(orig_open, ORIG_OPEN, OpenFn);
accessor!(orig_close, ORIG_CLOSE, CloseFn);
accessor!(orig_read, ORIG_READ, ReadFn);
accessor!(orig_write, ORIG_WRITE, WriteFn);
accessor!(orig_lseek, ORIG_LSEEK, LseekFn);
accessor!(orig_xstat, ORIG_XSTAT, XstatFn);
accessor!(orig_unlink, ORIG_UNLINK, UnlinkFn);
accessor!(orig_getdirentries, ORIG_GETDIRENTRIES, GetdirentriesFn);
