//! Re-entrancy guard for hooks, modeled on `mirrord-layer`'s
//! `hook_guard_fn`/`DetourGuard` pattern (`socket/hooks.rs`'s
//! `unwrap_or_bypass_with`): if a hook is invoked while we're already inside
//! one (for example, `tracing`'s own writer calling `write` while we're
//! mid-`write` hook), fall back to the real primitive instead of recursing
//! into the network path, where it could deadlock on
//! [`crate::connection`]'s lock or loop forever.
//!
//! The proc-macro crate that generates `hook_guard_fn` wasn't available to
//! build against here, so this is a plain function wrapper instead
//! (DESIGN.md notes the dependency drop).

use std::cell::Cell;

thread_local! {
    static HOOK_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Runs `body` unless we're already inside a hook on this thread, in which
/// case `fallback` runs instead. Both closures return the same type, which
/// is always the raw FFI return value the caller's hook is about to give
/// back to the application.
pub fn with_hook_guard<T>(fallback: impl FnOnce() -> T, body: impl FnOnce() -> T) -> T {
    let already_inside = HOOK_DEPTH.with(|depth| {
        let current = depth.get();
        depth.set(current + 1);
        current > 0
    });

    let result = if already_inside {
        fallback()
    } else {
        body()
    };

    HOOK_DEPTH.with(|depth| depth.set(depth.get() - 1));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outermost_call_runs_body() {
        let ran = with_hook_guard(|| "fallback", || "body");
        assert_eq!(ran, "body");
    }

    #[test]
    fn nested_call_runs_fallback() {
        let outcome = with_hook_guard(
            || unreachable!("outer call is not itself reentrant"),
            || with_hook_guard(|| "inner fallback", || "inner body"),
        );
        assert_eq!(outcome, "inner fallback");
    }

    #[test]
    fn depth_resets_after_body_returns_so_later_calls_are_not_reentrant() {
        let _ = with_hook_guard(|| "fallback", || "body");
        let second = with_hook_guard(|| "fallback", || "body");
        assert_eq!(second, "body");
    }
}
