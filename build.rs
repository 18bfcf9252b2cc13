//! Build script for tieralloc.
//!
//! Checks the feature/target combination and reports anything that would
//! make the preloadable library misbehave at run time.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PRELOAD");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");

    let preload_enabled = env::var("CARGO_FEATURE_PRELOAD").is_ok();
    let parking_lot_enabled = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();

    // =========================================================================
    // Preload
    // =========================================================================

    if preload_enabled {
        if target_os != "linux" {
            emit_warning("'preload' enabled on a non-Linux target");
            emit_note("The init/fini hooks live in .init_array/.fini_array and will not run;");
            emit_note("the exported malloc family falls back to the volatile tier only.");
        } else if target_env != "gnu" {
            emit_warning("'preload' enabled on a non-glibc target");
            emit_note("The volatile tier reaches the host heap through libc::malloc,");
            emit_note("which resolves back to the preloaded symbols. Use a gnu target.");
        }

        if !is_release {
            emit_note("Tip: build the preloadable library in release mode:");
            emit_note("  cargo build --release --features preload");
        }
    }

    // =========================================================================
    // Release build recommendations
    // =========================================================================

    if is_release && diagnostics_enabled {
        emit_info("Diagnostics print to stderr in this release build");
    }

    if is_release && preload_enabled && !parking_lot_enabled {
        emit_note("Tip: 'parking_lot' shortens the statistics critical section:");
        emit_note("  tieralloc = { version = \"0.1\", features = [\"preload\", \"parking_lot\"] }");
    }
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[tieralloc] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[tieralloc]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[tieralloc] warning: {}", msg);
}
