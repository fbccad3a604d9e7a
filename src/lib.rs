//! # guardalloc
//!
//! A debug-mode instrumentation layer over the system allocator. It trades
//! throughput for forensic precision: every tracked allocation gets a
//! metadata tag and two 64-byte sentinel guard regions, so out-of-bounds
//! writes, double frees, invalid frees, and leaks are caught and attributed
//! to the call site that caused them.
//!
//! ## What it catches
//!
//! - Writes past either end of a payload (verified at free time)
//! - Frees and reallocs of addresses it never handed out
//! - Double frees, attributed to both the allocator and the first freer
//! - Blocks never freed by shutdown, via [`GuardAlloc::check_leaks`]
//!
//! Any of the fatal conditions logs an attributed error and terminates the
//! process - corruption is never something to recover from. The `try_*`
//! variants return [`Violation`] values instead, for tests and tooling.
//!
//! With tracking disabled, every operation degrades to a direct system
//! allocator call with zero bookkeeping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guardalloc::{AllocConfig, GuardAlloc};
//!
//! let alloc = GuardAlloc::new(AllocConfig::tracked());
//!
//! let buf = unsafe { alloc.recalloc(std::ptr::null_mut(), 256, "read_profile") };
//! // ... fill and use buf ...
//! unsafe { alloc.free(buf, "read_profile") };
//!
//! // At shutdown: report anything never freed
//! alloc.check_leaks();
//! ```

pub mod api;
pub mod diagnostics;

mod core;
mod sync;
mod util;

// Re-export public API at crate root for convenience
pub use api::alloc::GuardAlloc;
pub use api::config::AllocConfig;
pub use api::stats::{AllocStats, Leak};

pub use diagnostics::{GuardBoundary, Violation};

// Layout constants, useful for tests that exercise the guards directly
pub use crate::core::{GUARD_BYTE, GUARD_SIZE};
