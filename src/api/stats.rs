//! Allocation statistics and leak findings.

use crate::util::size::format_bytes;

/// Aggregated tracking statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Sum of payload sizes over all currently allocated (non-freed) tags.
    pub live_bytes: usize,

    /// Peak of `live_bytes` over the whole run (high water mark).
    pub peak_bytes: usize,

    /// Creation and growth events.
    ///
    /// This is a growth-event count, not a call count: it increments when a
    /// block is created and when a reallocation increases a block's size,
    /// but never on a shrink or a free.
    pub alloc_calls: u64,

    /// Every allocation ever tracked, freed or live.
    pub tag_count: usize,
}

impl AllocStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for AllocStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tracking statistics:")?;
        writeln!(f, "  Live bytes:  {}", format_bytes(self.live_bytes))?;
        writeln!(f, "  Peak bytes:  {}", format_bytes(self.peak_bytes))?;
        writeln!(f, "  Alloc calls: {}", self.alloc_calls)?;
        writeln!(f, "  Tags:        {}", self.tag_count)?;
        Ok(())
    }
}

/// One never-freed allocation found by the leak scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leak {
    /// Call site that created (or last grew) the block.
    pub alloc_site: &'static str,
    /// Leaked payload size in bytes.
    pub size: usize,
    /// Leading printable run of the payload, if it looks like a string.
    pub looks_like: Option<String>,
}
