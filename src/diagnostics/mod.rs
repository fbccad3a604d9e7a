//! Diagnostics: the violation taxonomy and the emission backend.
//!
//! | Code  | Meaning                                  |
//! |-------|------------------------------------------|
//! | GA001 | out of memory                            |
//! | GA002 | reallocation of an unallocated address   |
//! | GA003 | free of an unallocated address           |
//! | GA004 | double free                              |
//! | GA005 | lower guard boundary overrun             |
//! | GA006 | upper guard boundary overrun             |
//!
//! Leak findings are advisory, carry no code, and are emitted at warn level
//! by the leak scanner.

pub(crate) mod emit;
pub mod violation;

pub use violation::{GuardBoundary, Violation};
