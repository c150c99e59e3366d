//! # Process Memory Snapshot
//!
//! Copies the interesting part of a live process's address space into owned
//! buffers once, so every later stage (registry scan, pointer chasing, stack
//! walking) reads one frozen view instead of racing the target.
//!
//! ## What gets captured
//!
//! ```text
//! /proc/<pid>/maps                     kind
//! 00400000-0047b000 r-xp  /app   -->   Text   (code, rodata, data)
//! 0047b000-004bc000 rw-p  /app   -->   Text
//! 004bc000-004f0000 rw-p         -->   Other  (bss right after the image)
//! c000000000-c004000000 rw-p     -->   Heap   (Go arena window)
//! 7ffd...  rw-p  [stack]         -->   discarded
//! ```
//!
//! ## Consistency
//!
//! The target keeps running while regions are copied one after another, so a
//! snapshot is not a point-in-time image: a goroutine created or exiting
//! between two region reads can leave dangling pointers. Everything
//! downstream treats unreadable addresses as ordinary rejections, never as
//! errors.
//!
//! ## Module Structure
//!
//! - **`maps`**: `/proc/<pid>/maps` parsing
//! - **`image`**: the [`ProcessImage`] seam and its procfs implementation
//! - **`region`**: classification rules and owned [`MemoryRegion`] buffers

pub mod image;
pub mod maps;
pub mod region;

pub use image::{ProcImage, ProcessImage};
pub use maps::{parse_maps, parse_maps_line, MapEntry, Permissions};
pub use region::{classify, Classified, MemoryRegion, RegionKind};

use log::info;

use crate::domain::InspectError;

/// Frozen copy of a process's text, data and heap regions
#[derive(Debug, Default)]
pub struct Snapshot {
    texts: Vec<MemoryRegion>,
    heaps: Vec<MemoryRegion>,
    others: Vec<MemoryRegion>,
    /// `(start, kind, position within its kind)`, sorted by start
    index: Vec<(u64, RegionKind, usize)>,
}

impl Snapshot {
    /// Classify the image's mappings and read every accepted one
    ///
    /// # Errors
    /// Fails if the mappings cannot be enumerated or any accepted region
    /// cannot be read; no partial snapshot is returned.
    pub fn capture<I: ProcessImage + ?Sized>(image: &I) -> Result<Self, InspectError> {
        let entries = image.mappings()?;
        let classified = classify(&entries);

        let mut regions = Vec::with_capacity(classified.len());
        for Classified { entry, kind } in classified {
            let data = image.read_at(entry.start, entry.size()).map_err(|source| {
                InspectError::RegionReadFailed { start: entry.start, end: entry.end, source }
            })?;
            regions.push(MemoryRegion::new(entry.start, kind, data));
        }

        let snapshot = Self::from_regions(regions);
        info!(
            "Snapshot: {} text, {} other, {} heap regions ({} KB)",
            snapshot.texts.len(),
            snapshot.others.len(),
            snapshot.heaps.len(),
            snapshot.total_bytes() / 1024
        );
        Ok(snapshot)
    }

    /// Build a snapshot from already captured regions, keeping their order per kind
    #[must_use]
    pub fn from_regions(regions: impl IntoIterator<Item = MemoryRegion>) -> Self {
        let mut snapshot = Self::default();
        for region in regions {
            let bucket = match region.kind() {
                RegionKind::Text => &mut snapshot.texts,
                RegionKind::Heap => &mut snapshot.heaps,
                RegionKind::Other => &mut snapshot.others,
            };
            snapshot.index.push((region.start(), region.kind(), bucket.len()));
            bucket.push(region);
        }
        snapshot.index.sort_by_key(|&(start, _, _)| start);
        snapshot
    }

    #[must_use]
    pub fn texts(&self) -> &[MemoryRegion] {
        &self.texts
    }

    #[must_use]
    pub fn heaps(&self) -> &[MemoryRegion] {
        &self.heaps
    }

    #[must_use]
    pub fn others(&self) -> &[MemoryRegion] {
        &self.others
    }

    /// Regions searched for the task registry: text first, then other
    pub fn scan_regions(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.texts.iter().chain(self.others.iter())
    }

    /// Load address of the process image (start of the first text region)
    #[must_use]
    pub fn init_addr(&self) -> Option<u64> {
        self.texts.first().map(MemoryRegion::start)
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.texts.iter().chain(&self.heaps).chain(&self.others).map(MemoryRegion::size).sum()
    }

    /// Region containing `addr`, if any
    #[must_use]
    pub fn region_at(&self, addr: u64) -> Option<&MemoryRegion> {
        let pos = self.index.partition_point(|&(start, _, _)| start <= addr);
        let &(_, kind, idx) = self.index.get(pos.checked_sub(1)?)?;
        let region = match kind {
            RegionKind::Text => &self.texts[idx],
            RegionKind::Heap => &self.heaps[idx],
            RegionKind::Other => &self.others[idx],
        };
        region.contains(addr).then_some(region)
    }

    /// Borrow `len` bytes at `addr`
    ///
    /// Returns `None` (inaccessible) when the range is not entirely inside
    /// one captured region.
    #[must_use]
    pub fn read(&self, addr: u64, len: u64) -> Option<&[u8]> {
        self.region_at(addr)?.read(addr, len)
    }

    /// Read a little-endian pointer-sized word
    #[must_use]
    pub fn read_u64(&self, addr: u64) -> Option<u64> {
        let bytes = self.read(addr, 8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }
}
