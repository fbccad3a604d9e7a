//! Allocator configuration.

/// Configuration for the guarded allocator.
#[derive(Debug, Clone)]
pub struct AllocConfig {
    /// Enable allocation tracking (tags, guard bytes, leak scanning).
    ///
    /// When disabled every operation is a direct, unguarded call into the
    /// system allocator: no tags are created, no guards exist, and the leak
    /// scanner is a no-op. Only observability changes, never allocation
    /// semantics visible to the caller.
    pub tracking: bool,

    /// Lookahead cap, in bytes, for the leak scanner's string sniffing
    /// (default: 128).
    pub string_sniff_limit: usize,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            tracking: cfg!(debug_assertions),
            string_sniff_limit: 128,
        }
    }
}

impl AllocConfig {
    /// Create a config with tracking enabled regardless of build profile.
    pub fn tracked() -> Self {
        Self {
            tracking: true,
            ..Self::default()
        }
    }

    /// Create a config with tracking disabled (passthrough only).
    pub fn passthrough() -> Self {
        Self {
            tracking: false,
            ..Self::default()
        }
    }

    /// Builder pattern: set tracking.
    pub fn with_tracking(mut self, enable: bool) -> Self {
        self.tracking = enable;
        self
    }

    /// Builder pattern: set the string sniffing lookahead cap.
    pub fn with_string_sniff_limit(mut self, limit: usize) -> Self {
        self.string_sniff_limit = limit;
        self
    }
}
