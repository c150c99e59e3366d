use gscope::domain::{InspectError, TaskId};
use gscope::layout::LayoutSet;
use gscope::scanner::{Rejection, RegistryScanner};
use gscope::snapshot::{MemoryRegion, RegionKind, Snapshot};
use gscope_common::TaskStatus;

const DATA: u64 = 0x0050_0000;
const HEAP: u64 = 0x00c0_0000_0000;

// go1.17 runtime.g offsets
const STACK_LO: usize = 0;
const STACK_HI: usize = 8;
const SCHED_PC: usize = 64;
const SCHED_BP: usize = 104;
const STATUS: usize = 144;
const GOID: usize = 152;

fn put(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

struct FakeTask {
    id: u64,
    status: u32,
    stack: (u64, u64),
}

fn task(id: u64, status: u32, lo: u64, hi: u64) -> FakeTask {
    FakeTask { id, status, stack: (lo, hi) }
}

/// Heap holding a pointer array at `HEAP` and one g per task after it
fn heap_with(tasks: &[FakeTask]) -> (u64, Vec<u8>) {
    let mut heap = vec![0u8; 0x1000 + tasks.len() * 0x100];
    for (i, t) in tasks.iter().enumerate() {
        let g_off = 0x1000 + i * 0x100;
        put(&mut heap, i * 8, HEAP + g_off as u64);
        put(&mut heap, g_off + STACK_LO, t.stack.0);
        put(&mut heap, g_off + STACK_HI, t.stack.1);
        put(&mut heap, g_off + SCHED_PC, 0x40_1000 + i as u64);
        put(&mut heap, g_off + SCHED_BP, 0);
        heap[g_off + STATUS..g_off + STATUS + 4].copy_from_slice(&t.status.to_le_bytes());
        put(&mut heap, g_off + GOID, t.id);
    }
    (HEAP, heap)
}

fn live_tasks() -> Vec<FakeTask> {
    vec![
        task(1, 4, 0xc000_2000, 0xc000_4000),
        task(2, 4, 0xc000_4000, 0xc000_4800),
        task(3, 1, 0xc000_8000, 0xc001_0000),
    ]
}

fn snapshot(data: Vec<u8>, heap: (u64, Vec<u8>)) -> Snapshot {
    Snapshot::from_regions([
        MemoryRegion::new(DATA, RegionKind::Other, data),
        MemoryRegion::new(heap.0, RegionKind::Heap, heap.1),
    ])
}

fn layouts() -> LayoutSet {
    LayoutSet::for_version("go1.21.5").unwrap()
}

#[test]
fn test_finds_single_registry() {
    let mut data = vec![0u8; 0x200];
    put(&mut data, 0x80, HEAP);
    put(&mut data, 0x88, 3);
    put(&mut data, 0x90, 3);
    let snapshot = snapshot(data, heap_with(&live_tasks()));
    let layouts = layouts();

    let registry = RegistryScanner::new(&snapshot, &layouts).scan().unwrap();
    assert_eq!(registry.address, DATA + 0x80);
    let ids: Vec<TaskId> = registry.tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![TaskId(1), TaskId(2), TaskId(3)]);
    assert_eq!(registry.tasks[2].status, TaskStatus::Runnable);
    assert_eq!(registry.tasks[1].stack_size(), 0x800);
}

#[test]
fn test_lower_registry_wins() {
    let mut data = vec![0u8; 0x200];
    for header in [0x40, 0x140] {
        put(&mut data, header, HEAP);
        put(&mut data, header + 8, 3);
    }
    let snapshot = snapshot(data, heap_with(&live_tasks()));
    let layouts = layouts();

    let registry = RegistryScanner::new(&snapshot, &layouts).scan().unwrap();
    assert_eq!(registry.address, DATA + 0x40);
}

#[test]
fn test_no_registry() {
    let snapshot = snapshot(vec![0u8; 0x200], heap_with(&live_tasks()));
    let layouts = layouts();

    let err = RegistryScanner::new(&snapshot, &layouts).scan().unwrap_err();
    match err {
        InspectError::RegistryNotFound { layout, candidates } => {
            assert_eq!(layout, "go1.17");
            assert_eq!(candidates, 0x200 / 8);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_too_short_registry_rejected() {
    let mut data = vec![0u8; 0x100];
    put(&mut data, 0, HEAP);
    put(&mut data, 8, 2);
    let snapshot = snapshot(data, heap_with(&live_tasks()));
    let layouts = layouts();
    let scanner = RegistryScanner::new(&snapshot, &layouts);

    assert_eq!(scanner.check_candidate(DATA), Err(Rejection::TooFewTasks(2)));
    assert!(scanner.scan().is_err());
}

#[test]
fn test_invalid_element_rejects_whole_candidate() {
    let mut tasks = live_tasks();
    tasks[2].stack = (0xc000_8000, 0xc000_8100);
    let mut data = vec![0u8; 0x100];
    put(&mut data, 0, HEAP);
    put(&mut data, 8, 3);
    let snapshot = snapshot(data, heap_with(&tasks));
    let layouts = layouts();
    let scanner = RegistryScanner::new(&snapshot, &layouts);

    assert_eq!(
        scanner.check_candidate(DATA),
        Err(Rejection::UnalignedStack { index: 2, size: 0x100 })
    );
}

#[test]
fn test_wrong_first_id_rejected() {
    let mut tasks = live_tasks();
    tasks.swap(0, 1);
    let mut data = vec![0u8; 0x100];
    put(&mut data, 0, HEAP);
    put(&mut data, 8, 3);
    let snapshot = snapshot(data, heap_with(&tasks));
    let layouts = layouts();

    assert_eq!(
        RegistryScanner::new(&snapshot, &layouts).check_candidate(DATA),
        Err(Rejection::WrongBootstrapId(2))
    );
}

#[test]
fn test_garbage_length_stops_at_first_unreadable_slot() {
    let mut data = vec![0u8; 0x100];
    put(&mut data, 0, HEAP);
    put(&mut data, 8, u64::MAX);
    let snapshot = snapshot(data, heap_with(&live_tasks()));
    let layouts = layouts();

    // slot 3 holds a null pointer, so the fourth g is unreadable
    let rejection = RegistryScanner::new(&snapshot, &layouts).check_candidate(DATA).unwrap_err();
    assert!(matches!(rejection, Rejection::Inaccessible { .. }));
}

#[test]
fn test_dead_task_may_have_no_stack() {
    let mut tasks = live_tasks();
    tasks.push(task(9, 6, 0, 0));
    let mut data = vec![0u8; 0x100];
    put(&mut data, 0, HEAP);
    put(&mut data, 8, 4);
    let snapshot = snapshot(data, heap_with(&tasks));
    let layouts = layouts();

    let tasks = RegistryScanner::new(&snapshot, &layouts).check_candidate(DATA).unwrap();
    assert_eq!(tasks.len(), 4);
    assert!(tasks[3].is_dead());
}

#[test]
fn test_header_in_heap_is_not_scanned() {
    let (base, mut heap) = heap_with(&live_tasks());
    put(&mut heap, 0x800, HEAP);
    put(&mut heap, 0x808, 3);
    put(&mut heap, 0x810, 3);
    let snapshot = snapshot(vec![0u8; 0x200], (base, heap));
    let layouts = layouts();
    let scanner = RegistryScanner::new(&snapshot, &layouts);

    assert_eq!(scanner.check_candidate(HEAP + 0x800).map(|t| t.len()), Ok(3));
    assert!(matches!(
        scanner.scan(),
        Err(InspectError::RegistryNotFound { candidates: 0x40, .. })
    ));
}

#[test]
fn test_text_hit_wins_over_other_hit() {
    const TEXT: u64 = 0x0060_0000;
    let header = |at: usize| {
        let mut buf = vec![0u8; 0x100];
        put(&mut buf, at, HEAP);
        put(&mut buf, at + 8, 3);
        buf
    };
    let (base, heap) = heap_with(&live_tasks());
    let snapshot = Snapshot::from_regions([
        MemoryRegion::new(DATA, RegionKind::Other, header(0x10)),
        MemoryRegion::new(TEXT, RegionKind::Text, header(0x20)),
        MemoryRegion::new(base, RegionKind::Heap, heap),
    ]);
    let layouts = layouts();

    let registry = RegistryScanner::new(&snapshot, &layouts).scan().unwrap();
    assert_eq!(registry.address, TEXT + 0x20);
}
