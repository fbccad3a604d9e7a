//! Tracking core.
//!
//! These are the only modules that should contain `unsafe` code.

pub(crate) mod block;
pub(crate) mod registry;
pub(crate) mod tag;

pub use block::{GUARD_BYTE, GUARD_SIZE};
