//! Guarded block layout and raw allocation.
//!
//! A tracked block is a single system allocation shaped as:
//!
//! ```plaintext
//! +---------------------+
//! | lower guard         | GUARD_SIZE bytes of GUARD_BYTE
//! +---------------------+
//! | payload             | size bytes, handed to the caller
//! +---------------------+
//! | upper guard         | GUARD_SIZE bytes of GUARD_BYTE
//! +---------------------+
//! ```
//!
//! Guards are written when the block is created or grown and verified only
//! when it is freed. Corruption of the lower guard means something wrote
//! backwards past the payload start; the upper guard catches forward
//! overruns.

/// Length of each guard region in bytes.
pub const GUARD_SIZE: usize = 64;

/// Sentinel byte the guard regions are filled with.
pub const GUARD_BYTE: u8 = 0x5a;

/// Full size of the underlying allocation for a payload of `size` bytes.
///
/// Returns `None` on arithmetic overflow, which the registry treats the
/// same as an allocation failure.
pub(crate) fn guarded_size(size: usize) -> Option<usize> {
    size.checked_add(2 * GUARD_SIZE)
}

/// Allocate a fresh guarded block. Returns `(block base, payload)`.
///
/// Both guard regions are filled with [`GUARD_BYTE`]; the payload is left
/// uninitialized. Returns `None` if the system allocator fails.
pub(crate) unsafe fn alloc_guarded(size: usize) -> Option<(*mut u8, *mut u8)> {
    let total = guarded_size(size)?;
    let block = libc::malloc(total) as *mut u8;
    if block.is_null() {
        return None;
    }
    let data = block.add(GUARD_SIZE);
    std::ptr::write_bytes(block, GUARD_BYTE, GUARD_SIZE);
    std::ptr::write_bytes(data.add(size), GUARD_BYTE, GUARD_SIZE);
    Some((block, data))
}

/// Resize an existing guarded block to hold `size` payload bytes.
///
/// The lower guard travels with the block contents through `realloc`; the
/// upper guard is rewritten at the new payload end. Returns the possibly
/// moved `(block base, payload)`, or `None` on allocation failure (the
/// original block is untouched in that case).
///
/// # Safety
///
/// `block` must be a base pointer previously returned by [`alloc_guarded`]
/// or `grow_guarded` and not yet released.
pub(crate) unsafe fn grow_guarded(block: *mut u8, size: usize) -> Option<(*mut u8, *mut u8)> {
    let total = guarded_size(size)?;
    let block = libc::realloc(block as *mut libc::c_void, total) as *mut u8;
    if block.is_null() {
        return None;
    }
    let data = block.add(GUARD_SIZE);
    std::ptr::write_bytes(data.add(size), GUARD_BYTE, GUARD_SIZE);
    Some((block, data))
}

/// Return a guarded block to the system allocator.
///
/// # Safety
///
/// `block` must be a base pointer previously returned by [`alloc_guarded`]
/// or [`grow_guarded`] and not yet released.
pub(crate) unsafe fn release_guarded(block: *mut u8) {
    libc::free(block as *mut libc::c_void);
}

/// Check that a guard region still holds the sentinel everywhere.
///
/// # Safety
///
/// `guard` must point to [`GUARD_SIZE`] readable bytes.
pub(crate) unsafe fn guard_intact(guard: *const u8) -> bool {
    for i in 0..GUARD_SIZE {
        if *guard.add(i) != GUARD_BYTE {
            return false;
        }
    }
    true
}

/// Untracked passthrough: direct system `realloc`.
///
/// # Safety
///
/// `ptr` must be null or a live pointer from this passthrough path.
pub(crate) unsafe fn raw_realloc(ptr: *mut u8, size: usize) -> *mut u8 {
    libc::realloc(ptr as *mut libc::c_void, size) as *mut u8
}

/// Untracked passthrough: direct system `free`.
///
/// # Safety
///
/// `ptr` must be null or a live pointer from [`raw_realloc`].
pub(crate) unsafe fn raw_free(ptr: *mut u8) {
    libc::free(ptr as *mut libc::c_void);
}

/// Extract a leading printable run from a leaked payload.
///
/// Best-effort aid for leak reports: if the payload starts with printable
/// bytes terminated by a NUL, the payload end, or the `cap` lookahead
/// limit, the run is probably a leaked string worth printing. A payload
/// that runs into a non-printable, non-NUL byte is not reported.
pub(crate) fn printable_prefix(payload: &[u8], cap: usize) -> Option<String> {
    fn is_print(c: u8) -> bool {
        c > 0 && c < 0x7f
    }

    let mut i = 0;
    while i < payload.len() && is_print(payload[i]) {
        if i + 1 >= payload.len() || i + 1 >= cap || payload[i + 1] == 0 {
            return Some(String::from_utf8_lossy(&payload[..=i]).into_owned());
        }
        i += 1;
    }
    None
}
