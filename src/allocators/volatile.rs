//! Volatile tier: the host C library's own heap.
//!
//! When this crate is preloaded it exports `malloc` & co. itself, so the
//! volatile tier must reach glibc through its internal `__libc_*` entry
//! points rather than the public symbols, which would resolve back to us.

use std::ffi::c_void;

use super::TierBackend;
use crate::api::tier::Tier;

#[cfg(target_env = "gnu")]
mod host {
    use std::ffi::c_void;

    extern "C" {
        fn __libc_malloc(size: usize) -> *mut c_void;
        fn __libc_calloc(nmemb: usize, size: usize) -> *mut c_void;
        fn __libc_realloc(ptr: *mut c_void, size: usize) -> *mut c_void;
        fn __libc_free(ptr: *mut c_void);
    }

    #[inline]
    pub unsafe fn malloc(size: usize) -> *mut c_void {
        // SAFETY: direct call to the libc allocator symbol.
        __libc_malloc(size)
    }

    #[inline]
    pub unsafe fn calloc(nmemb: usize, size: usize) -> *mut c_void {
        // SAFETY: direct call to the libc allocator symbol.
        __libc_calloc(nmemb, size)
    }

    #[inline]
    pub unsafe fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
        // SAFETY: caller guarantees `ptr` came from this heap.
        __libc_realloc(ptr, size)
    }

    #[inline]
    pub unsafe fn free(ptr: *mut c_void) {
        // SAFETY: caller guarantees `ptr` came from this heap.
        __libc_free(ptr)
    }
}

#[cfg(not(target_env = "gnu"))]
mod host {
    pub use libc::{calloc, free, malloc, realloc};
}

/// The always-available tier.
///
/// Stateless: it needs no setup, which is why allocations made while the
/// engine is still initializing can be sent here unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatileTier;

impl VolatileTier {
    pub const fn new() -> Self {
        Self
    }
}

impl TierBackend for VolatileTier {
    fn tier(&self) -> Tier {
        Tier::Volatile
    }

    fn allocate(&self, size: usize) -> *mut u8 {
        // SAFETY: malloc accepts any size and reports failure as null.
        unsafe { host::malloc(size) as *mut u8 }
    }

    fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        // SAFETY: calloc checks `count * size` for overflow itself.
        unsafe { host::calloc(count, size) as *mut u8 }
    }

    unsafe fn resize(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        host::realloc(ptr as *mut c_void, size) as *mut u8
    }

    unsafe fn release(&self, ptr: *mut u8) {
        host::free(ptr as *mut c_void)
    }

    /// Anything not claimed by another tier belongs to the host heap.
    fn owns(&self, _ptr: *const u8) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatile_roundtrip() {
        let tier = VolatileTier::new();
        let p = tier.allocate(64);
        assert!(!p.is_null());
        unsafe {
            p.write_bytes(0xAB, 64);
            let p = tier.resize(p, 4096);
            assert!(!p.is_null());
            assert_eq!(*p.add(63), 0xAB);
            tier.release(p);
        }
    }

    #[test]
    fn test_volatile_zeroed() {
        let tier = VolatileTier::new();
        let p = tier.allocate_zeroed(16, 8);
        assert!(!p.is_null());
        unsafe {
            assert!(std::slice::from_raw_parts(p, 128).iter().all(|&b| b == 0));
            tier.release(p);
        }
    }
}
