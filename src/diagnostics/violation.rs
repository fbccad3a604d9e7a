//! Memory violation taxonomy.
//!
//! Every fatal condition the checked allocator can detect is a `Violation`.
//! Violations carry full attribution: the call site that tripped the check
//! and, where it exists, the call site that created the block.
//!
//! Codes follow the pattern:
//! - `GA00x` - allocation and free violations
//! - leak findings are advisory and have no code

/// Which guard region was overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardBoundary {
    /// The region immediately before the payload.
    Lower,
    /// The region immediately after the payload.
    Upper,
}

impl GuardBoundary {
    /// Name used in diagnostic messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardBoundary::Lower => "lower",
            GuardBoundary::Upper => "upper",
        }
    }
}

/// A fatal memory violation detected by the checked allocator.
///
/// Detection is the entire value proposition: once one of these exists, the
/// heap can no longer be trusted, so the reporting path terminates the
/// process. The `try_*` methods on [`GuardAlloc`](crate::GuardAlloc) surface
/// the same values as ordinary `Result` errors for testing and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The system allocator could not satisfy a growth request.
    OutOfMemory {
        /// Call site that requested the allocation.
        site: &'static str,
        /// Requested payload size in bytes.
        size: usize,
    },

    /// Reallocation of an address no live tag owns.
    InvalidRealloc {
        /// Call site that requested the reallocation.
        site: &'static str,
        /// The raw address passed in.
        addr: usize,
    },

    /// Free of an address no tag owns.
    InvalidFree {
        /// Call site that requested the free.
        site: &'static str,
        /// The raw address passed in.
        addr: usize,
    },

    /// Free of an address whose tag was already freed.
    DoubleFree {
        /// Call site of the second free.
        site: &'static str,
        /// The payload address.
        addr: usize,
        /// Payload size at the time of the first free.
        size: usize,
        /// Call site that allocated the block.
        alloc_site: &'static str,
        /// Call site of the first free.
        free_site: &'static str,
    },

    /// Sentinel bytes adjacent to the payload were overwritten.
    GuardCorruption {
        /// Which guard region deviated.
        boundary: GuardBoundary,
        /// Call site that requested the free that found the damage.
        site: &'static str,
        /// The payload address.
        addr: usize,
        /// Payload size in bytes.
        size: usize,
        /// Call site that allocated the block.
        alloc_site: &'static str,
    },
}

impl Violation {
    /// Diagnostic code for this violation.
    pub fn code(&self) -> &'static str {
        match self {
            Violation::OutOfMemory { .. } => "GA001",
            Violation::InvalidRealloc { .. } => "GA002",
            Violation::InvalidFree { .. } => "GA003",
            Violation::DoubleFree { .. } => "GA004",
            Violation::GuardCorruption {
                boundary: GuardBoundary::Lower,
                ..
            } => "GA005",
            Violation::GuardCorruption {
                boundary: GuardBoundary::Upper,
                ..
            } => "GA006",
        }
    }

    /// The call site that tripped the check.
    pub fn site(&self) -> &'static str {
        match self {
            Violation::OutOfMemory { site, .. }
            | Violation::InvalidRealloc { site, .. }
            | Violation::InvalidFree { site, .. }
            | Violation::DoubleFree { site, .. }
            | Violation::GuardCorruption { site, .. } => site,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::OutOfMemory { size, .. } => {
                write!(f, "out of memory, tried to allocate {} bytes", size)
            }
            Violation::InvalidRealloc { addr, .. } => {
                write!(f, "trying to reallocate unallocated address ({:#x})", addr)
            }
            Violation::InvalidFree { addr, .. } => {
                write!(f, "trying to free unallocated address ({:#x})", addr)
            }
            Violation::DoubleFree {
                addr,
                size,
                alloc_site,
                free_site,
                ..
            } => {
                write!(
                    f,
                    "address ({:#x}), {} bytes allocated by {}(), already freed by {}()",
                    addr, size, alloc_site, free_site
                )
            }
            Violation::GuardCorruption {
                boundary,
                addr,
                size,
                alloc_site,
                ..
            } => {
                write!(
                    f,
                    "address ({:#x}), {} bytes allocated by {}(), overran {} boundary",
                    addr,
                    size,
                    alloc_site,
                    boundary.as_str()
                )
            }
        }
    }
}

impl std::error::Error for Violation {}
