//! The main allocator type.

use std::sync::Arc;

use crate::api::config::AllocConfig;
use crate::api::stats::{AllocStats, Leak};
use crate::core::block;
use crate::core::registry::TagRegistry;
use crate::diagnostics::emit;
use crate::diagnostics::violation::Violation;
use crate::sync::mutex::Mutex;

/// The debug-mode guarded allocator.
///
/// Wraps the system allocator with per-allocation tags, sentinel guard
/// regions, and a leak scanner. Every entry point takes a call-site label
/// (a short string naming the calling operation) used for diagnostic
/// attribution; the allocator never infers labels itself.
///
/// Violations - out-of-bounds writes found at free time, double frees,
/// frees or reallocs of unknown addresses, and allocation failure - are
/// reported through the log facade and terminate the process. The `try_*`
/// twins return the same findings as [`Violation`] values instead, for
/// tests and tooling.
///
/// Cheap to clone (internally uses `Arc`) and thread-safe: all tracking
/// state sits behind a single lock.
///
/// # Example
///
/// ```rust,no_run
/// use guardalloc::{AllocConfig, GuardAlloc};
///
/// let alloc = GuardAlloc::new(AllocConfig::tracked());
///
/// let ptr = unsafe { alloc.realloc(std::ptr::null_mut(), 64, "load_config") };
/// // ... use ptr ...
/// unsafe { alloc.free(ptr, "load_config") };
///
/// alloc.check_leaks();
/// ```
#[derive(Clone)]
pub struct GuardAlloc {
    inner: Arc<Inner>,
}

struct Inner {
    config: AllocConfig,
    registry: Mutex<TagRegistry>,
}

impl GuardAlloc {
    /// Create a new allocator with the given configuration.
    pub fn new(config: AllocConfig) -> Self {
        let registry = Mutex::new(TagRegistry::new(&config));
        Self {
            inner: Arc::new(Inner { config, registry }),
        }
    }

    /// Create an allocator with default configuration (tracking follows
    /// the build profile).
    pub fn with_defaults() -> Self {
        Self::new(AllocConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &AllocConfig {
        &self.inner.config
    }

    /// Whether allocation tracking is enabled.
    pub fn is_tracking(&self) -> bool {
        self.inner.config.tracking
    }

    /// Allocate or resize a block. Fatal on any violation.
    ///
    /// Pass a null `ptr` for a fresh allocation. With tracking enabled the
    /// block is tagged and fenced with guard bytes; resizing an address the
    /// registry does not own (or owns but already freed) is fatal. Without
    /// tracking this is a direct system `realloc` with only an
    /// out-of-memory check.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by this
    /// allocator and not yet freed. The returned pointer is valid for
    /// `size` bytes until freed or resized again.
    pub unsafe fn realloc(&self, ptr: *mut u8, size: usize, site: &'static str) -> *mut u8 {
        match self.try_realloc(ptr, size, site) {
            Ok(data) => data,
            Err(violation) => emit::fatal(&violation),
        }
    }

    /// Allocate or resize, then zero the whole payload. Fatal on violation.
    ///
    /// # Safety
    ///
    /// Same contract as [`realloc`](Self::realloc).
    pub unsafe fn recalloc(&self, ptr: *mut u8, size: usize, site: &'static str) -> *mut u8 {
        match self.try_recalloc(ptr, size, site) {
            Ok(data) => data,
            Err(violation) => emit::fatal(&violation),
        }
    }

    /// Validate and free a block. Fatal on any violation. Null is a no-op.
    ///
    /// With tracking enabled this verifies both guard regions, rejects
    /// unknown addresses and double frees, and retires the tag. Without
    /// tracking it is a direct system `free` with no validation.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by this
    /// allocator; the caller must not use it afterwards.
    pub unsafe fn free(&self, ptr: *mut u8, site: &'static str) {
        if let Err(violation) = self.try_free(ptr, site) {
            emit::fatal(&violation);
        }
    }

    /// Fallible form of [`realloc`](Self::realloc): returns the violation
    /// instead of terminating.
    ///
    /// # Safety
    ///
    /// Same contract as [`realloc`](Self::realloc).
    pub unsafe fn try_realloc(
        &self,
        ptr: *mut u8,
        size: usize,
        site: &'static str,
    ) -> Result<*mut u8, Violation> {
        if !self.inner.config.tracking {
            let data = block::raw_realloc(ptr, size);
            if data.is_null() && size > 0 {
                return Err(Violation::OutOfMemory { site, size });
            }
            return Ok(data);
        }
        self.inner.registry.lock().realloc(ptr, size, site)
    }

    /// Fallible form of [`recalloc`](Self::recalloc).
    ///
    /// # Safety
    ///
    /// Same contract as [`realloc`](Self::realloc).
    pub unsafe fn try_recalloc(
        &self,
        ptr: *mut u8,
        size: usize,
        site: &'static str,
    ) -> Result<*mut u8, Violation> {
        let data = self.try_realloc(ptr, size, site)?;
        if !data.is_null() {
            std::ptr::write_bytes(data, 0, size);
        }
        Ok(data)
    }

    /// Fallible form of [`free`](Self::free).
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free).
    pub unsafe fn try_free(&self, ptr: *mut u8, site: &'static str) -> Result<(), Violation> {
        if !self.inner.config.tracking {
            block::raw_free(ptr);
            return Ok(());
        }
        self.inner.registry.lock().free(ptr, site)
    }

    /// Scan for leaks and report them through the log facade.
    ///
    /// Typically called once at shutdown. Emits one warn-level line per
    /// never-freed tag (allocating call site and size, plus the payload's
    /// leading printable run if it looks like a string) and one debug-level
    /// summary: allocation calls, peak bytes in megabytes, and total tag
    /// count. No-op when tracking is disabled. Advisory only: nothing is
    /// freed or mutated.
    pub fn check_leaks(&self) {
        if !self.inner.config.tracking {
            return;
        }
        self.inner.registry.lock().scan_leaks();
    }

    /// Collect the leak findings without logging them.
    ///
    /// Empty when tracking is disabled.
    pub fn leaks(&self) -> Vec<Leak> {
        if !self.inner.config.tracking {
            return Vec::new();
        }
        self.inner.registry.lock().leaks()
    }

    /// Get current tracking statistics.
    ///
    /// All zeros when tracking is disabled.
    pub fn stats(&self) -> AllocStats {
        if !self.inner.config.tracking {
            return AllocStats::new();
        }
        self.inner.registry.lock().stats()
    }
}

impl Default for GuardAlloc {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// Safety: the registry (which holds the raw block pointers) is only reached
// through its mutex; the pointers themselves are bookkeeping the registry
// owns, not thread-affine resources.
unsafe impl Send for GuardAlloc {}
unsafe impl Sync for GuardAlloc {}
