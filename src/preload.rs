//! C allocation entry points for `LD_PRELOAD`.
//!
//! The process-wide [`TierAlloc`] is built and started from `.init_array`,
//! before the program's `main`, and stopped from `.fini_array`. Until it is
//! published every call goes straight to the volatile tier.

use std::ffi::c_void;
use std::sync::OnceLock;

use crate::allocators::{TierBackend, VolatileTier};
use crate::api::alloc::TierAlloc;
use crate::api::config::TierConfig;

static GLOBAL: OnceLock<TierAlloc> = OnceLock::new();

const FALLBACK: VolatileTier = VolatileTier::new();

#[no_mangle]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    match GLOBAL.get() {
        Some(alloc) => alloc.allocate(size).cast(),
        None => FALLBACK.allocate(size).cast(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    match GLOBAL.get() {
        Some(alloc) => alloc.allocate_zeroed(nmemb, size).cast(),
        None => FALLBACK.allocate_zeroed(nmemb, size).cast(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    match GLOBAL.get() {
        // SAFETY: the caller passes null or a pointer from malloc/calloc/realloc.
        Some(alloc) => alloc.resize(ptr.cast(), size).cast(),
        None if ptr.is_null() => FALLBACK.allocate(size).cast(),
        None => FALLBACK.resize(ptr.cast(), size).cast(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    match GLOBAL.get() {
        // SAFETY: the caller passes null or a live pointer it owns.
        Some(alloc) => alloc.release(ptr.cast()),
        None if ptr.is_null() => {}
        None => FALLBACK.release(ptr.cast()),
    }
}

extern "C" fn tieralloc_init() {
    let alloc = GLOBAL.get_or_init(TierAlloc::from_env);
    if let Err(e) = alloc.start() {
        #[cfg(feature = "log")]
        log::warn!("tieralloc: {}", e);
        #[cfg(not(feature = "log"))]
        let _ = e;
    }
}

extern "C" fn tieralloc_fini() {
    if let Some(alloc) = GLOBAL.get() {
        let _ = alloc.stop();
    }
}

#[used]
#[cfg_attr(target_os = "linux", link_section = ".init_array")]
static INIT: extern "C" fn() = tieralloc_init;

#[used]
#[cfg_attr(target_os = "linux", link_section = ".fini_array")]
static FINI: extern "C" fn() = tieralloc_fini;
