//! Task registry scanner
//!
//! Finds `runtime.allgs` without symbols. Every 8-byte-aligned address in the
//! text and other regions is treated as a possible slice header; a candidate
//! is accepted only if the slice it describes holds at least three pointers
//! to structures that all look like goroutines.
//!
//! ```text
//! candidate ──► { array, len }            (registry prototype)
//!                   │
//!                   ▼
//!               [ *g, *g, *g, ... ]       (len pointers)
//!                  │
//!                  ▼
//!               { stack.lo, stack.hi, sched.pc, sched.bp,
//!                 atomicstatus, goid }    (task prototype)
//! ```
//!
//! Nothing guarantees that only the real registry passes; in practice the
//! invariants in [`validate_task`] are selective enough. The predicate is a
//! standalone function so it can be tightened without touching the scan.

use gscope_common::{
    registry_fields, task_fields, TaskStatus, BOOTSTRAP_TASK_ID, MIN_LIVE_TASKS, POINTER_SIZE,
    STACK_GRANULARITY,
};
use log::{info, trace};
use thiserror::Error;

use crate::domain::{InspectError, Task, TaskId};
use crate::layout::LayoutSet;
use crate::pointer::TypedPointer;
use crate::snapshot::Snapshot;

/// Task descriptor fields as read from memory, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawTask {
    pub id: u64,
    pub status: u32,
    pub stack_lo: u64,
    pub stack_hi: u64,
    pub pc: u64,
    pub bp: u64,
}

/// Why a candidate address was rejected
///
/// Expected and frequent; only ever logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{what} at 0x{addr:x} is not in the snapshot")]
    Inaccessible { what: &'static str, addr: u64 },

    #[error("registry length {0} is below the live minimum")]
    TooFewTasks(u64),

    #[error("registry array pointer is null")]
    NullArray,

    #[error("first task has id {0}, expected the bootstrap id")]
    WrongBootstrapId(u64),

    #[error("task {index} has status {status} outside the valid range")]
    InvalidStatus { index: u64, status: u32 },

    #[error("live task {index} has a null stack bound (0x{lo:x}-0x{hi:x})")]
    MissingStack { index: u64, lo: u64, hi: u64 },

    #[error("task {index} stack is inverted (0x{lo:x}-0x{hi:x})")]
    InvertedStack { index: u64, lo: u64, hi: u64 },

    #[error("task {index} stack size {size} is not a multiple of the stack granularity")]
    UnalignedStack { index: u64, size: u64 },
}

/// Check one decoded task against the goroutine invariants
///
/// `index` is the task's position in the registry; the bootstrap id rule
/// only applies to index 0.
///
/// # Errors
/// Returns the first invariant the task violates
pub fn validate_task(index: u64, raw: &RawTask) -> Result<Task, Rejection> {
    if index == 0 && raw.id != BOOTSTRAP_TASK_ID {
        return Err(Rejection::WrongBootstrapId(raw.id));
    }

    let status = TaskStatus::from_raw(raw.status)
        .ok_or(Rejection::InvalidStatus { index, status: raw.status })?;

    let (lo, hi) = (raw.stack_lo, raw.stack_hi);
    if !status.is_dead() && (lo == 0 || hi == 0) {
        return Err(Rejection::MissingStack { index, lo, hi });
    }
    if hi < lo {
        return Err(Rejection::InvertedStack { index, lo, hi });
    }
    if (hi - lo) % STACK_GRANULARITY != 0 {
        return Err(Rejection::UnalignedStack { index, size: hi - lo });
    }

    Ok(Task { id: TaskId(raw.id), status, stack_lo: lo, stack_hi: hi, pc: raw.pc, bp: raw.bp })
}

/// Read every task field through a task-prototype pointer
///
/// # Errors
/// Returns [`Rejection::Inaccessible`] if any field lies outside the snapshot
pub fn decode_task(g: &TypedPointer<'_>) -> Result<RawTask, Rejection> {
    let read = |name: &'static str| {
        g.field(name).ok_or(Rejection::Inaccessible { what: name, addr: g.address() })
    };

    Ok(RawTask {
        id: read(task_fields::GOID)?,
        // a 4-byte field never decodes above u32::MAX
        status: u32::try_from(read(task_fields::ATOMIC_STATUS)?).unwrap_or(u32::MAX),
        stack_lo: read(task_fields::STACK_LO)?,
        stack_hi: read(task_fields::STACK_HI)?,
        pc: read(task_fields::SCHED_PC)?,
        bp: read(task_fields::SCHED_BP)?,
    })
}

/// Registry location and its decoded tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    /// Address of the slice header
    pub address: u64,
    /// Tasks in registry order
    pub tasks: Vec<Task>,
}

/// Brute-force search for the task registry in one snapshot
pub struct RegistryScanner<'a> {
    snapshot: &'a Snapshot,
    layouts: &'a LayoutSet,
}

impl<'a> RegistryScanner<'a> {
    #[must_use]
    pub fn new(snapshot: &'a Snapshot, layouts: &'a LayoutSet) -> Self {
        Self { snapshot, layouts }
    }

    /// Interpret `address` as a registry header and validate everything it points to
    ///
    /// Stops at the first failing element.
    ///
    /// # Errors
    /// Returns the reason the candidate was rejected
    pub fn check_candidate(&self, address: u64) -> Result<Vec<Task>, Rejection> {
        let header = TypedPointer::new(address, self.layouts.registry(), self.snapshot);

        let len = header
            .field(registry_fields::LEN)
            .ok_or(Rejection::Inaccessible { what: "registry header", addr: address })?;
        if len < MIN_LIVE_TASKS {
            return Err(Rejection::TooFewTasks(len));
        }

        let array = header
            .field(registry_fields::ARRAY)
            .ok_or(Rejection::Inaccessible { what: "registry header", addr: address })?;
        if array == 0 {
            return Err(Rejection::NullArray);
        }

        let slots = TypedPointer::untyped(array, self.snapshot);
        // grows only as elements validate; `len` may be garbage
        let mut tasks = Vec::new();
        for i in 0..len {
            let g_addr = slots
                .index(i, POINTER_SIZE)
                .ok_or(Rejection::Inaccessible { what: "task array", addr: array })?;
            let g = TypedPointer::new(g_addr, self.layouts.task(), self.snapshot);
            let raw = decode_task(&g)?;
            tasks.push(validate_task(i, &raw)?);
        }
        Ok(tasks)
    }

    /// Scan text then other regions in ascending address order, stopping at
    /// the first candidate that validates
    ///
    /// # Errors
    /// Returns [`InspectError::RegistryNotFound`] when no candidate validates
    pub fn scan(&self) -> Result<Registry, InspectError> {
        let mut candidates = 0u64;

        for region in self.snapshot.scan_regions() {
            let mut address = region.start().next_multiple_of(POINTER_SIZE);
            while address < region.end() {
                candidates += 1;
                match self.check_candidate(address) {
                    Ok(tasks) => {
                        info!(
                            "Task registry found at 0x{address:x} ({} tasks, {candidates} candidates checked)",
                            tasks.len()
                        );
                        return Ok(Registry { address, tasks });
                    }
                    Err(rejection) => trace!("0x{address:x}: {rejection}"),
                }
                address += POINTER_SIZE;
            }
        }

        Err(InspectError::RegistryNotFound { layout: self.layouts.label(), candidates })
    }
}
