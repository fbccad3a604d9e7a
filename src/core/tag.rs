//! Tag records: one per allocation ever tracked.

/// Lifecycle state of a tracked allocation.
///
/// `Allocated` is the initial state; grow and shrink keep it. A successful
/// free is the only transition out, and `Freed` is terminal: the tag record
/// survives forever so later frees of the same address can be identified as
/// double frees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagState {
    /// The block is live and owned by the caller.
    Allocated,
    /// The block was freed; `site` names the freeing operation.
    Freed { site: &'static str },
}

/// Metadata describing one tracked allocation.
///
/// The pointers are bookkeeping only: once the tag is `Freed` the block is
/// gone and they are never dereferenced again.
#[derive(Debug)]
pub(crate) struct Tag {
    /// Base of the underlying system allocation (start of the lower guard).
    pub block: *mut u8,
    /// Payload address handed to the caller; doubles as the lookup key.
    pub data: *mut u8,
    /// Current payload size in bytes.
    pub size: usize,
    /// Call site that most recently created or grew this block.
    pub alloc_site: &'static str,
    /// Lifecycle state.
    pub state: TagState,
}

impl Tag {
    pub(crate) fn new(block: *mut u8, data: *mut u8, size: usize, site: &'static str) -> Self {
        Self {
            block,
            data,
            size,
            alloc_site: site,
            state: TagState::Allocated,
        }
    }

    /// Whether this tag still owns a live block.
    pub(crate) fn is_allocated(&self) -> bool {
        matches!(self.state, TagState::Allocated)
    }
}
