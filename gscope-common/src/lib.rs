//! # Shared Runtime Layout Definitions
//!
//! Constants and field-offset tables describing the Go runtime structures that
//! gscope reads out of a live process. Nothing in here is derived at runtime:
//! every offset was pinned by hand against a specific Go release on
//! linux/amd64, and a new runtime release may need a new [`LayoutTable`].
//!
//! ## Key Types
//!
//! - [`TaskStatus`] - Scheduling state of a goroutine (`runtime.g.atomicstatus`)
//! - [`FieldSpec`] - Offset and width of one field inside a foreign structure
//! - [`LayoutTable`] - The per-version pair of `runtime.g` / `runtime.allgs` tables
//! - [`LAYOUTS`] - Every known layout, oldest first

#![no_std]

// ============================================================================
// Runtime Constants
// ============================================================================

/// Goroutine id reserved for the bootstrap goroutine (`runtime.main`)
///
/// The first entry of `runtime.allgs` is always the main goroutine, so a
/// candidate registry whose first task has any other id is rejected.
pub const BOOTSTRAP_TASK_ID: u64 = 1;

/// Minimum number of goroutines a live Go process always has
///
/// The main goroutine, the background sweeper/scavenger and the finalizer
/// goroutine exist before `main.main` runs.
pub const MIN_LIVE_TASKS: u64 = 3;

/// Every goroutine stack size is a multiple of this many bytes
pub const STACK_GRANULARITY: u64 = 1024;

/// Pointer width on the supported architecture (amd64)
pub const POINTER_SIZE: u64 = 8;

/// Start of the address window the Go allocator reserves for heap arenas
///
/// On linux/amd64 the runtime hints its arenas at `0x00c0 << 32`.
pub const HEAP_ARENA_START: u64 = 0x00c0_0000_0000;

/// End (exclusive) of the heap arena hint window
pub const HEAP_ARENA_END: u64 = 0x00d0_0000_0000;

// ============================================================================
// Goroutine Status
// ============================================================================

/// Scheduling state of a goroutine
///
/// Mirrors the `_G*` constants of the runtime. `_Gidle` (0) is deliberately
/// absent: an idle g is never published in `allgs`, so seeing 0 means the
/// candidate is not a goroutine at all. The `_Gscan` bit is not accepted
/// either; a status read while the GC is scanning a stack fails validation.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Runnable = 1,
    Running = 2,
    Syscall = 3,
    Waiting = 4,
    /// Unused by the runtime, kept so the enumeration has no holes
    Moribund = 5,
    /// Terminal state; the g sits on a free list and its stack may be gone
    Dead = 6,
    /// Unused, see `Moribund`
    Enqueue = 7,
    Copystack = 8,
    Preempted = 9,
}

impl TaskStatus {
    /// Lowest raw value accepted as a goroutine status
    pub const MIN_RAW: u32 = 1;

    /// Highest raw value accepted as a goroutine status
    pub const MAX_RAW: u32 = 9;

    /// Decode a raw `atomicstatus` value
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::Runnable,
            2 => Self::Running,
            3 => Self::Syscall,
            4 => Self::Waiting,
            5 => Self::Moribund,
            6 => Self::Dead,
            7 => Self::Enqueue,
            8 => Self::Copystack,
            9 => Self::Preempted,
            _ => return None,
        })
    }

    /// Name used by the Go runtime's own tracebacks
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Runnable => "runnable",
            Self::Running => "running",
            Self::Syscall => "syscall",
            Self::Waiting => "waiting",
            Self::Moribund => "moribund",
            Self::Dead => "dead",
            Self::Enqueue => "enqueue",
            Self::Copystack => "copystack",
            Self::Preempted => "preempted",
        }
    }

    #[must_use]
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }
}

// ============================================================================
// Field Names
// ============================================================================

/// Field names of the task descriptor (`runtime.g`)
pub mod task_fields {
    pub const GOID: &str = "goid";
    pub const ATOMIC_STATUS: &str = "atomicstatus";
    pub const STACK_LO: &str = "stack.lo";
    pub const STACK_HI: &str = "stack.hi";
    pub const SCHED_PC: &str = "sched.pc";
    pub const SCHED_BP: &str = "sched.bp";

    /// Every field the scanner and walker read
    pub const REQUIRED: &[&str] = &[GOID, ATOMIC_STATUS, STACK_LO, STACK_HI, SCHED_PC, SCHED_BP];
}

/// Field names of the task registry header (the `runtime.allgs` slice header)
pub mod registry_fields {
    pub const ARRAY: &str = "array";
    pub const LEN: &str = "len";

    pub const REQUIRED: &[&str] = &[ARRAY, LEN];
}

// ============================================================================
// Layout Tables
// ============================================================================

/// Position of one field inside a foreign structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Byte offset from the start of the structure
    pub offset: u64,
    /// Width in bytes (1, 2, 4 or 8)
    pub size: u64,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(name: &'static str, offset: u64, size: u64) -> Self {
        Self { name, offset, size }
    }
}

/// Field tables valid from `min_version` up to the next table in [`LAYOUTS`]
#[derive(Debug, Clone, Copy)]
pub struct LayoutTable {
    /// Human-readable label, e.g. `"go1.17"`
    pub label: &'static str,
    /// First `(major, minor)` Go release this table applies to
    pub min_version: (u32, u32),
    /// `runtime.g`
    pub task: &'static [FieldSpec],
    /// `runtime.allgs` slice header
    pub registry: &'static [FieldSpec],
}

/// The `[]*g` slice header: `{array, len, cap}`, identical in every release
const REGISTRY_SLICE: &[FieldSpec] = &[
    FieldSpec::new(registry_fields::ARRAY, 0, 8),
    FieldSpec::new(registry_fields::LEN, 8, 8),
];

/// `runtime.g` for go1.17 through go1.22
///
/// ```text
/// 0    stack.lo        8    stack.hi
/// 16   stackguard0     24   stackguard1
/// 32   _panic          40   _defer        48  m
/// 56   sched (gobuf: sp, pc +8, g, ctxt, ret, lr, bp +48)
/// 112  syscallsp       120  syscallpc     128 stktopsp
/// 136  param           144  atomicstatus  148 stackLock
/// 152  goid
/// ```
const TASK_GO1_17: &[FieldSpec] = &[
    FieldSpec::new(task_fields::STACK_LO, 0, 8),
    FieldSpec::new(task_fields::STACK_HI, 8, 8),
    FieldSpec::new(task_fields::SCHED_PC, 64, 8),
    FieldSpec::new(task_fields::SCHED_BP, 104, 8),
    FieldSpec::new(task_fields::ATOMIC_STATUS, 144, 4),
    FieldSpec::new(task_fields::GOID, 152, 8),
];

/// `runtime.g` from go1.23, which inserted `syscallbp` after `syscallpc`
const TASK_GO1_23: &[FieldSpec] = &[
    FieldSpec::new(task_fields::STACK_LO, 0, 8),
    FieldSpec::new(task_fields::STACK_HI, 8, 8),
    FieldSpec::new(task_fields::SCHED_PC, 64, 8),
    FieldSpec::new(task_fields::SCHED_BP, 104, 8),
    FieldSpec::new(task_fields::ATOMIC_STATUS, 152, 4),
    FieldSpec::new(task_fields::GOID, 160, 8),
];

/// Every known layout, sorted by `min_version`
pub static LAYOUTS: &[LayoutTable] = &[
    LayoutTable {
        label: "go1.17",
        min_version: (1, 17),
        task: TASK_GO1_17,
        registry: REGISTRY_SLICE,
    },
    LayoutTable {
        label: "go1.23",
        min_version: (1, 23),
        task: TASK_GO1_23,
        registry: REGISTRY_SLICE,
    },
];
