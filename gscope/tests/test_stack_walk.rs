use gscope::snapshot::{MemoryRegion, RegionKind, Snapshot};
use gscope::symbolization::{Function, SymbolResolver, SymbolTable, TextSection};
use gscope::walker::{walk, StackWalker};

const TEXT: u64 = 0x40_0000;
const STACK: u64 = 0x00c0_0010_0000;

fn frame(stack: &mut [u8], bp: u64, parent: u64, ra: u64) {
    let off = usize::try_from(bp - STACK).unwrap();
    stack[off..off + 8].copy_from_slice(&parent.to_le_bytes());
    stack[off + 8..off + 16].copy_from_slice(&ra.to_le_bytes());
}

fn snapshot() -> Snapshot {
    let mut stack = vec![0u8; 0x400];
    frame(&mut stack, STACK + 0x100, STACK + 0x180, TEXT + 0x1234);
    frame(&mut stack, STACK + 0x180, STACK + 0x300, TEXT + 0x2010);
    frame(&mut stack, STACK + 0x300, 0, TEXT + 0x3000);
    Snapshot::from_regions([
        MemoryRegion::new(TEXT, RegionKind::Text, vec![0; 0x4000]),
        MemoryRegion::new(STACK, RegionKind::Heap, stack),
    ])
}

fn resolver(snapshot: &Snapshot) -> SymbolResolver {
    let functions = vec![
        Function { entry: TEXT + 0x1200, end: TEXT + 0x1400, name: "runtime.gopark".into() },
        Function { entry: TEXT + 0x2000, end: TEXT + 0x2100, name: "main.handle".into() },
        Function { entry: TEXT + 0x2ff0, end: TEXT + 0x3100, name: "runtime.goexit".into() },
    ];
    let text = TextSection { address: TEXT + 0x1000, file_offset: 0x1000 };
    SymbolResolver::new(SymbolTable::from_functions(&functions, text), snapshot.init_addr())
}

#[test]
fn test_walk_and_symbolize() {
    let snapshot = snapshot();
    let resolver = resolver(&snapshot);

    let frames: Vec<String> = walk(&snapshot, STACK + 0x100).map(|pc| resolver.format(pc)).collect();
    assert_eq!(frames, vec!["runtime.gopark+52", "main.handle+16", "runtime.goexit+16"]);
}

#[test]
fn test_walk_is_restartable() {
    let snapshot = snapshot();
    let first: Vec<u64> = walk(&snapshot, STACK + 0x100).collect();
    let second: Vec<u64> = walk(&snapshot, STACK + 0x100).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_walk_from_middle_and_zero() {
    let snapshot = snapshot();
    assert_eq!(walk(&snapshot, STACK + 0x180).count(), 2);
    assert_eq!(walk(&snapshot, 0).count(), 0);
    assert_eq!(StackWalker::new(&snapshot, STACK + 0x100).with_max_depth(2).count(), 2);
}

#[test]
fn test_resolution_is_stable() {
    let snapshot = snapshot();
    let resolver = resolver(&snapshot);

    let pcs: Vec<u64> = walk(&snapshot, STACK + 0x100).collect();
    let once: Vec<String> = pcs.iter().map(|&pc| resolver.format(pc)).collect();
    let twice: Vec<String> = pcs.iter().map(|&pc| resolver.format(pc)).collect();
    assert_eq!(once, twice);
    assert_eq!(resolver.format(0x10), "?+0x10");
}
