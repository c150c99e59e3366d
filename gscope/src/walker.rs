//! Frame-pointer stack walking over a snapshot
//!
//! Go on amd64 keeps frame pointers, so a suspended goroutine's saved `bp`
//! heads a linked list of frames:
//!
//! ```text
//! bp ──► [ parent bp ][ return address ]
//!           │            (bp + 8)
//!           ▼
//!        [ parent bp ][ return address ] ──► ... ──► 0
//! ```
//!
//! The walk is lazy and re-reads only the frozen snapshot, so walking the
//! same `bp` twice yields the same addresses. It ends at a zero parent, at a
//! frame outside the snapshot, or after `max_depth` frames, which also bounds
//! cyclic chains.

use log::trace;
use std::iter::FusedIterator;

use crate::snapshot::Snapshot;

/// Frames followed before a walk gives up
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// One stack frame, identified by its frame pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub bp: u64,
}

impl Frame {
    /// Return address saved just above the frame pointer
    #[must_use]
    pub fn return_address(&self, snapshot: &Snapshot) -> Option<u64> {
        snapshot.read_u64(self.bp.checked_add(8)?)
    }

    /// Caller's frame, read from the word the frame pointer points at
    #[must_use]
    pub fn parent(&self, snapshot: &Snapshot) -> Option<Frame> {
        snapshot.read_u64(self.bp).map(|bp| Frame { bp })
    }
}

/// Iterator over return addresses, innermost frame first
#[derive(Debug, Clone)]
pub struct StackWalker<'a> {
    snapshot: &'a Snapshot,
    frame: Option<Frame>,
    depth: usize,
    max_depth: usize,
}

impl<'a> StackWalker<'a> {
    /// Start a walk at `bp`; a zero `bp` yields nothing
    #[must_use]
    pub fn new(snapshot: &'a Snapshot, bp: u64) -> Self {
        Self {
            snapshot,
            frame: (bp != 0).then_some(Frame { bp }),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Iterator for StackWalker<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let frame = self.frame.take()?;
        if self.depth >= self.max_depth {
            trace!("Stack walk hit depth limit {} at bp 0x{:x}", self.max_depth, frame.bp);
            return None;
        }

        let Some(pc) = frame.return_address(self.snapshot) else {
            trace!("Frame at 0x{:x} is outside the snapshot", frame.bp);
            return None;
        };
        self.depth += 1;

        self.frame = frame.parent(self.snapshot).filter(|parent| parent.bp != 0);
        Some(pc)
    }
}

impl FusedIterator for StackWalker<'_> {}

/// Walk the frame chain starting at `bp`
#[must_use]
pub fn walk(snapshot: &Snapshot, bp: u64) -> StackWalker<'_> {
    StackWalker::new(snapshot, bp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MemoryRegion, RegionKind};

    const STACK: u64 = 0x00c0_0001_0000;

    /// Heap region holding `words` as consecutive u64 values
    fn stack_snapshot(words: &[u64]) -> Snapshot {
        let data = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Snapshot::from_regions([MemoryRegion::new(STACK, RegionKind::Heap, data)])
    }

    #[test]
    fn test_two_frame_chain() {
        let bp0 = STACK;
        let bp1 = STACK + 0x20;
        let mut words = vec![0u64; 8];
        words[0] = bp1; // [bp0]
        words[1] = 0xaaaa; // [bp0 + 8]
        words[4] = 0; // [bp1]
        words[5] = 0xbbbb; // [bp1 + 8]
        let snapshot = stack_snapshot(&words);

        let pcs: Vec<u64> = walk(&snapshot, bp0).collect();
        assert_eq!(pcs, vec![0xaaaa, 0xbbbb]);

        // restartable: same input, same output
        assert_eq!(walk(&snapshot, bp0).collect::<Vec<_>>(), pcs);
    }

    #[test]
    fn test_zero_bp_is_empty() {
        let snapshot = stack_snapshot(&[0; 4]);
        assert_eq!(walk(&snapshot, 0).count(), 0);
    }

    #[test]
    fn test_unreadable_frame_ends_walk() {
        let snapshot = stack_snapshot(&[0xdead_0000, 0x1111]);
        // parent 0xdead0000 is outside the snapshot
        assert_eq!(walk(&snapshot, STACK).collect::<Vec<_>>(), vec![0x1111]);
        assert_eq!(walk(&snapshot, 0x10).count(), 0);
    }

    #[test]
    fn test_cycle_is_bounded_by_depth() {
        // frame points at itself
        let snapshot = stack_snapshot(&[STACK, 0x2222]);
        assert_eq!(walk(&snapshot, STACK).count(), DEFAULT_MAX_DEPTH);
        let limited: Vec<u64> = walk(&snapshot, STACK).with_max_depth(3).collect();
        assert_eq!(limited, vec![0x2222; 3]);
    }

    #[test]
    fn test_descending_chain_is_followed() {
        // bp0 above its parent bp1
        let bp0 = STACK + 0x40;
        let bp1 = STACK;
        let mut words = vec![0u64; 10];
        words[0] = 0; // [bp1]
        words[1] = 0xbbbb; // [bp1 + 8]
        words[8] = bp1; // [bp0]
        words[9] = 0xaaaa; // [bp0 + 8]
        let snapshot = stack_snapshot(&words);

        assert_eq!(walk(&snapshot, bp0).collect::<Vec<_>>(), vec![0xaaaa, 0xbbbb]);
    }

    #[test]
    fn test_depth_limit() {
        // 4 ascending frames of 16 bytes each, last parent 0
        let mut words = Vec::new();
        for i in 0..4u64 {
            let parent = if i == 3 { 0 } else { STACK + (i + 1) * 16 };
            words.push(parent);
            words.push(0x100 + i);
        }
        let snapshot = stack_snapshot(&words);

        assert_eq!(walk(&snapshot, STACK).count(), 4);
        let limited: Vec<u64> = walk(&snapshot, STACK).with_max_depth(2).collect();
        assert_eq!(limited, vec![0x100, 0x101]);
    }
}
