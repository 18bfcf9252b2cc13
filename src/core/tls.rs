//! Thread-local reentry guard.
//!
//! Anything the engine does inside an entry point (taking a contended lock,
//! formatting a diagnostic, spawning the monitor) may allocate and land
//! back in `malloc` on the same thread. The guard lets the outer call run
//! the full path while nested calls take the volatile fast path.

use std::cell::Cell;

thread_local! {
    // Const-initialized and without a destructor: usable at any point of a
    // thread's life, including while its TLS is being torn down.
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Marks the current thread as inside an entry point until dropped.
pub(crate) struct ReentryGuard(());

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        let _ = DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Enter an entry point. `None` if this thread is already inside one.
#[inline]
pub(crate) fn enter() -> Option<ReentryGuard> {
    DEPTH
        .try_with(|depth| {
            if depth.get() > 0 {
                None
            } else {
                depth.set(1);
                Some(ReentryGuard(()))
            }
        })
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_is_refused() {
        let outer = enter();
        assert!(outer.is_some());
        assert!(enter().is_none());
        drop(outer);
        assert!(enter().is_some());
    }

    #[test]
    fn test_guard_is_per_thread() {
        let _outer = enter().unwrap();
        let inner_ok = std::thread::spawn(|| enter().is_some()).join().unwrap();
        assert!(inner_ok);
    }
}
