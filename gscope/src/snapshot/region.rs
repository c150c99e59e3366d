//! Region classification and owned region buffers

use gscope_common::{HEAP_ARENA_END, HEAP_ARENA_START};
use log::debug;
use std::fmt;

use super::maps::MapEntry;

/// What a captured region holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// File-backed mapping: executable code, rodata and initialized data
    Text,
    /// Anonymous mapping inside the Go heap arena window
    Heap,
    /// Anonymous mapping directly following text (bss, noptrbss)
    Other,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegionKind::Text => "text",
            RegionKind::Heap => "heap",
            RegionKind::Other => "other",
        })
    }
}

/// A mapping copied out of the target
///
/// The size is the length of the owned buffer, so `data.len() == size`
/// holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    start: u64,
    kind: RegionKind,
    data: Vec<u8>,
}

impl MemoryRegion {
    #[must_use]
    pub fn new(start: u64, kind: RegionKind, data: Vec<u8>) -> Self {
        Self { start, kind, data }
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// First address past the region
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size())
    }

    #[must_use]
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Borrow `len` bytes at `addr`, `None` unless the whole range is inside this region
    #[must_use]
    pub fn read(&self, addr: u64, len: u64) -> Option<&[u8]> {
        if !self.contains(addr) {
            return None;
        }
        let from = usize::try_from(addr - self.start).ok()?;
        let to = from.checked_add(usize::try_from(len).ok()?)?;
        self.data.get(from..to)
    }
}

/// A mapping that passed classification, before its bytes are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub entry: &'a MapEntry,
    pub kind: RegionKind,
}

/// Decide which mappings to capture and as what
///
/// Rules, in order of precedence, applied to readable mappings only:
/// 1. backed by an absolute file path: [`RegionKind::Text`]
/// 2. anonymous and starting inside the heap arena window: [`RegionKind::Heap`]
/// 3. anonymous and starting exactly where the last accepted text/other
///    region ended: [`RegionKind::Other`]
///
/// Everything else is discarded, including pseudo mappings such as `[stack]`.
#[must_use]
pub fn classify(entries: &[MapEntry]) -> Vec<Classified<'_>> {
    let mut accepted = Vec::new();
    // Only set once a text region is accepted, so `Some` also means "text seen"
    let mut last_end: Option<u64> = None;

    for entry in entries {
        if !entry.perms.read {
            debug!("Discarding unreadable mapping 0x{:x}-0x{:x}", entry.start, entry.end);
            continue;
        }

        let kind = if entry.is_file_backed() {
            RegionKind::Text
        } else if entry.is_anonymous() && (HEAP_ARENA_START..HEAP_ARENA_END).contains(&entry.start) {
            RegionKind::Heap
        } else if entry.is_anonymous() && last_end == Some(entry.start) {
            RegionKind::Other
        } else {
            debug!(
                "Discarding mapping 0x{:x}-0x{:x} {}",
                entry.start,
                entry.end,
                if entry.pathname.is_empty() { "[anonymous]" } else { &entry.pathname }
            );
            continue;
        };

        if kind != RegionKind::Heap {
            last_end = Some(entry.end);
        }
        debug!("Classified 0x{:x}-0x{:x} as {kind}", entry.start, entry.end);
        accepted.push(Classified { entry, kind });
    }

    accepted
}
