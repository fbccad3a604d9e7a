//! The allocation registry: tag arena, address lookup, and statistics.
//!
//! One [`Tag`] exists per allocation ever tracked, held in an arena that
//! never shrinks. A hash map from payload address to arena index gives O(1)
//! lookup. On address reuse the newest tag wins the map slot; the older
//! record stays in the arena, which is what keeps double frees detectable.

use std::collections::HashMap;

use crate::api::config::AllocConfig;
use crate::api::stats::{AllocStats, Leak};
use crate::core::block;
use crate::core::tag::{Tag, TagState};
use crate::diagnostics::emit;
use crate::diagnostics::violation::{GuardBoundary, Violation};
use crate::util::size::megabytes;

/// Process-wide tracking state for one allocator instance.
///
/// Not synchronized itself; [`GuardAlloc`](crate::GuardAlloc) wraps it in a
/// single mutex.
pub(crate) struct TagRegistry {
    /// Every allocation ever tracked. Records are never removed.
    tags: Vec<Tag>,
    /// Payload address -> arena index of the newest tag at that address.
    by_addr: HashMap<usize, usize>,
    /// Sum of `size` over tags in state `Allocated`.
    live_bytes: usize,
    /// High water mark of `live_bytes`.
    peak_bytes: usize,
    /// Creation and growth events. Not a call count: shrinks and frees do
    /// not increment it.
    alloc_calls: u64,
    /// Lookahead cap for leak-scan string sniffing.
    sniff_limit: usize,
}

impl TagRegistry {
    pub(crate) fn new(config: &AllocConfig) -> Self {
        Self {
            tags: Vec::new(),
            by_addr: HashMap::new(),
            live_bytes: 0,
            peak_bytes: 0,
            alloc_calls: 0,
            sniff_limit: config.string_sniff_limit,
        }
    }

    /// Create or resize a tracked block. Returns the payload address.
    pub(crate) fn realloc(
        &mut self,
        ptr: *mut u8,
        size: usize,
        site: &'static str,
    ) -> Result<*mut u8, Violation> {
        if ptr.is_null() {
            return self.alloc_new(size, site);
        }

        let addr = ptr as usize;
        let index = match self.by_addr.get(&addr) {
            Some(&index) => index,
            None => return Err(Violation::InvalidRealloc { site, addr }),
        };
        // Resurrecting a freed tag would hide a use-after-free; treat it
        // with the same strictness as the free path.
        if !self.tags[index].is_allocated() {
            return Err(Violation::InvalidRealloc { site, addr });
        }

        let old_size = self.tags[index].size;
        // SAFETY: the tag is Allocated, so `block` is a live base pointer
        // owned by this registry.
        let (new_block, new_data) = unsafe { block::grow_guarded(self.tags[index].block, size) }
            .ok_or(Violation::OutOfMemory { site, size })?;

        let tag = &mut self.tags[index];
        tag.block = new_block;
        if new_data != tag.data {
            self.by_addr.remove(&addr);
            self.by_addr.insert(new_data as usize, index);
        }
        tag.data = new_data;
        tag.size = size;
        tag.alloc_site = site;

        self.record_resize(old_size, size);
        Ok(new_data)
    }

    fn alloc_new(&mut self, size: usize, site: &'static str) -> Result<*mut u8, Violation> {
        // SAFETY: fresh allocation, no preconditions.
        let (block, data) =
            unsafe { block::alloc_guarded(size) }.ok_or(Violation::OutOfMemory { site, size })?;

        let index = self.tags.len();
        self.tags.push(Tag::new(block, data, size, site));
        self.by_addr.insert(data as usize, index);

        self.live_bytes += size;
        self.alloc_calls += 1;
        self.bump_peak();
        Ok(data)
    }

    /// Validate and retire a tracked block.
    pub(crate) fn free(&mut self, ptr: *mut u8, site: &'static str) -> Result<(), Violation> {
        if ptr.is_null() {
            return Ok(());
        }

        let addr = ptr as usize;
        let index = match self.by_addr.get(&addr) {
            Some(&index) => index,
            None => return Err(Violation::InvalidFree { site, addr }),
        };

        let tag = &self.tags[index];
        if let TagState::Freed { site: free_site } = tag.state {
            return Err(Violation::DoubleFree {
                site,
                addr,
                size: tag.size,
                alloc_site: tag.alloc_site,
                free_site,
            });
        }

        // SAFETY: the tag is Allocated, so both guard regions are readable.
        unsafe {
            if !block::guard_intact(tag.block) {
                return Err(Violation::GuardCorruption {
                    boundary: GuardBoundary::Lower,
                    site,
                    addr,
                    size: tag.size,
                    alloc_site: tag.alloc_site,
                });
            }
            if !block::guard_intact(tag.data.add(tag.size)) {
                return Err(Violation::GuardCorruption {
                    boundary: GuardBoundary::Upper,
                    site,
                    addr,
                    size: tag.size,
                    alloc_site: tag.alloc_site,
                });
            }
        }

        // SAFETY: validated above; the block is live and registry-owned.
        // The tag record survives in the arena so a second free of this
        // address is reported as a double free, and the map entry stays
        // until a new allocation claims the address.
        unsafe { block::release_guarded(tag.block) };

        let size = tag.size;
        self.tags[index].state = TagState::Freed { site };
        self.live_bytes -= size;
        Ok(())
    }

    /// Collect every tag still in state `Allocated`.
    pub(crate) fn leaks(&self) -> Vec<Leak> {
        self.tags
            .iter()
            .filter(|tag| tag.is_allocated())
            .map(|tag| {
                let looks_like = if tag.size > 0 {
                    // SAFETY: the tag is Allocated, so the payload is live.
                    let payload = unsafe { std::slice::from_raw_parts(tag.data, tag.size) };
                    block::printable_prefix(payload, self.sniff_limit)
                } else {
                    None
                };
                Leak {
                    alloc_site: tag.alloc_site,
                    size: tag.size,
                    looks_like,
                }
            })
            .collect()
    }

    /// Walk the arena once and report every never-freed tag, then a summary
    /// line. Read-only: frees nothing, mutates nothing.
    pub(crate) fn scan_leaks(&self) {
        for leak in self.leaks() {
            emit::advise(
                "check_leaks",
                format_args!("{}() leaked {} bytes", leak.alloc_site, leak.size),
            );
            if let Some(text) = &leak.looks_like {
                emit::note(format_args!("looks like a string: '{}'", text));
            }
        }
        emit::note(format_args!(
            "{} allocation calls, high mark {:.1}mb, {} tags",
            self.alloc_calls,
            megabytes(self.peak_bytes),
            self.tags.len()
        ));
    }

    pub(crate) fn stats(&self) -> AllocStats {
        AllocStats {
            live_bytes: self.live_bytes,
            peak_bytes: self.peak_bytes,
            alloc_calls: self.alloc_calls,
            tag_count: self.tags.len(),
        }
    }

    fn record_resize(&mut self, old: usize, new: usize) {
        if new >= old {
            self.live_bytes += new - old;
            if new > old {
                self.alloc_calls += 1;
                self.bump_peak();
            }
        } else {
            self.live_bytes -= old - new;
        }
    }

    fn bump_peak(&mut self) {
        if self.live_bytes > self.peak_bytes {
            self.peak_bytes = self.live_bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{GUARD_BYTE, GUARD_SIZE};

    fn registry() -> TagRegistry {
        TagRegistry::new(&AllocConfig::default())
    }

    fn alloc(reg: &mut TagRegistry, size: usize, site: &'static str) -> *mut u8 {
        reg.realloc(std::ptr::null_mut(), size, site).unwrap()
    }

    #[test]
    fn test_live_bytes_track_allocated_tags() {
        let mut reg = registry();
        let a = alloc(&mut reg, 10, "a");
        let b = alloc(&mut reg, 20, "b");
        assert_eq!(reg.stats().live_bytes, 30);

        reg.free(a, "a_free").unwrap();
        assert_eq!(reg.stats().live_bytes, 20);

        reg.free(b, "b_free").unwrap();
        assert_eq!(reg.stats().live_bytes, 0);
        assert_eq!(reg.stats().tag_count, 2);
    }

    #[test]
    fn test_peak_is_monotone_high_water_mark() {
        let mut reg = registry();
        let a = alloc(&mut reg, 100, "a");
        assert_eq!(reg.stats().peak_bytes, 100);

        let b = alloc(&mut reg, 50, "b");
        assert_eq!(reg.stats().peak_bytes, 150);

        reg.free(a, "a_free").unwrap();
        assert_eq!(reg.stats().peak_bytes, 150);

        // Growing back under the peak leaves it alone
        let b = reg.realloc(b, 60, "b_grow").unwrap();
        assert_eq!(reg.stats().peak_bytes, 150);

        // Exceeding it moves it
        let b = reg.realloc(b, 200, "b_grow").unwrap();
        assert_eq!(reg.stats().peak_bytes, 200);
        reg.free(b, "b_free").unwrap();
    }

    #[test]
    fn test_alloc_calls_count_creations_and_growth_only() {
        let mut reg = registry();
        let p = alloc(&mut reg, 10, "a");
        assert_eq!(reg.stats().alloc_calls, 1);

        let p = reg.realloc(p, 40, "grow").unwrap();
        assert_eq!(reg.stats().alloc_calls, 2);

        // Shrink does not count
        let p = reg.realloc(p, 5, "shrink").unwrap();
        assert_eq!(reg.stats().alloc_calls, 2);

        // Neither does an equal-size realloc or a free
        let p = reg.realloc(p, 5, "same").unwrap();
        reg.free(p, "done").unwrap();
        assert_eq!(reg.stats().alloc_calls, 2);
    }

    #[test]
    fn test_zero_size_allocation_counts_as_event() {
        let mut reg = registry();
        let p = alloc(&mut reg, 0, "empty");
        assert_eq!(reg.stats().alloc_calls, 1);
        assert_eq!(reg.stats().live_bytes, 0);
        reg.free(p, "done").unwrap();
    }

    #[test]
    fn test_double_free_cites_both_sites() {
        let mut reg = registry();
        let p = alloc(&mut reg, 20, "maker");
        // Unrelated live allocations must not confuse attribution
        let q = alloc(&mut reg, 8, "other");
        let r = alloc(&mut reg, 16, "more");
        reg.free(p, "first_free").unwrap();

        let err = reg.free(p, "second_free").unwrap_err();
        match err {
            Violation::DoubleFree {
                site,
                alloc_site,
                free_site,
                size,
                ..
            } => {
                assert_eq!(site, "second_free");
                assert_eq!(alloc_site, "maker");
                assert_eq!(free_site, "first_free");
                assert_eq!(size, 20);
            }
            other => panic!("expected DoubleFree, got {:?}", other),
        }

        reg.free(q, "q").unwrap();
        reg.free(r, "r").unwrap();
    }

    #[test]
    fn test_invalid_free_of_unknown_address() {
        let mut reg = registry();
        let bogus = 0xdead_0000usize as *mut u8;
        let err = reg.free(bogus, "f").unwrap_err();
        assert!(matches!(err, Violation::InvalidFree { site: "f", .. }));
    }

    #[test]
    fn test_invalid_realloc_of_unknown_address() {
        let mut reg = registry();
        let bogus = 0xbeef_0000usize as *mut u8;
        let err = reg.realloc(bogus, 10, "r").unwrap_err();
        assert!(matches!(err, Violation::InvalidRealloc { site: "r", .. }));
    }

    #[test]
    fn test_realloc_of_freed_tag_is_rejected() {
        let mut reg = registry();
        let p = alloc(&mut reg, 10, "a");
        reg.free(p, "a_free").unwrap();
        let err = reg.realloc(p, 20, "resurrect").unwrap_err();
        assert!(matches!(
            err,
            Violation::InvalidRealloc {
                site: "resurrect",
                ..
            }
        ));
    }

    #[test]
    fn test_upper_guard_corruption_detected() {
        let mut reg = registry();
        let p = alloc(&mut reg, 4, "writer");
        // Overwrite the byte immediately following the 4-byte payload
        unsafe { *p.add(4) = 0 };

        let err = reg.free(p, "f").unwrap_err();
        match err {
            Violation::GuardCorruption {
                boundary,
                alloc_site,
                size,
                ..
            } => {
                assert_eq!(boundary, GuardBoundary::Upper);
                assert_eq!(alloc_site, "writer");
                assert_eq!(size, 4);
            }
            other => panic!("expected GuardCorruption, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_guard_corruption_detected() {
        let mut reg = registry();
        let p = alloc(&mut reg, 16, "writer");
        unsafe { *p.sub(1) = !GUARD_BYTE };

        let err = reg.free(p, "f").unwrap_err();
        assert!(matches!(
            err,
            Violation::GuardCorruption {
                boundary: GuardBoundary::Lower,
                ..
            }
        ));
    }

    #[test]
    fn test_any_upper_guard_byte_triggers() {
        // Last byte of the guard region, not just the first
        let mut reg = registry();
        let p = alloc(&mut reg, 8, "w");
        unsafe { *p.add(8 + GUARD_SIZE - 1) = 0x00 };
        let err = reg.free(p, "f").unwrap_err();
        assert!(matches!(
            err,
            Violation::GuardCorruption {
                boundary: GuardBoundary::Upper,
                ..
            }
        ));
    }

    #[test]
    fn test_leak_scan_reports_exactly_the_unfreed_tags() {
        let mut reg = registry();
        let _leaked = alloc(&mut reg, 10, "foo");
        let freed = alloc(&mut reg, 20, "bar");
        reg.free(freed, "bar_free").unwrap();

        let leaks = reg.leaks();
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].alloc_site, "foo");
        assert_eq!(leaks[0].size, 10);
        assert_eq!(reg.stats().tag_count, 2);
    }

    #[test]
    fn test_leak_scan_n_minus_k() {
        let mut reg = registry();
        let mut ptrs = Vec::new();
        for i in 0..6 {
            ptrs.push(alloc(&mut reg, 8 * (i + 1), "batch"));
        }
        for p in ptrs.drain(..4) {
            reg.free(p, "batch_free").unwrap();
        }

        let leaks = reg.leaks();
        assert_eq!(leaks.len(), 2);
        assert_eq!(reg.stats().tag_count, 6);
        let sizes: Vec<_> = leaks.iter().map(|l| l.size).collect();
        assert_eq!(sizes, vec![40, 48]);
    }

    #[test]
    fn test_leaked_string_is_sniffed() {
        let mut reg = registry();
        let p = alloc(&mut reg, 8, "strings");
        unsafe {
            std::ptr::copy_nonoverlapping(b"leak\0\0\0\0".as_ptr(), p, 8);
        }

        let leaks = reg.leaks();
        assert_eq!(leaks[0].looks_like.as_deref(), Some("leak"));
    }

    #[test]
    fn test_leaked_binary_payload_is_not_sniffed() {
        let mut reg = registry();
        let p = alloc(&mut reg, 4, "binary");
        unsafe {
            std::ptr::copy_nonoverlapping([0xff, 0xfe, 0x01, 0x02].as_ptr(), p, 4);
        }

        let leaks = reg.leaks();
        assert_eq!(leaks[0].looks_like, None);
    }

    #[test]
    fn test_realloc_preserves_payload_and_identity() {
        let mut reg = registry();
        let p = alloc(&mut reg, 4, "a");
        unsafe { std::ptr::copy_nonoverlapping(b"abcd".as_ptr(), p, 4) };

        let p = reg.realloc(p, 4096, "a_grow").unwrap();
        let payload = unsafe { std::slice::from_raw_parts(p, 4) };
        assert_eq!(payload, b"abcd");

        // Lookup still works after a potential move
        reg.free(p, "a_free").unwrap();
        assert_eq!(reg.stats().live_bytes, 0);
    }

    #[test]
    fn test_address_reuse_after_free_tracks_newest_tag() {
        let mut reg = registry();
        let p = alloc(&mut reg, 32, "first");
        reg.free(p, "first_free").unwrap();

        // The system allocator frequently hands the same block back
        let q = alloc(&mut reg, 32, "second");
        reg.free(q, "second_free").unwrap();

        assert_eq!(reg.stats().tag_count, 2);
        assert_eq!(reg.stats().live_bytes, 0);
        assert!(reg.leaks().is_empty());
    }
}
