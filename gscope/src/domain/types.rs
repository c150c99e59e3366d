//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep process ids, goroutine ids and raw addresses
//! from being mixed up in function signatures.

use gscope_common::TaskStatus;
use std::fmt;

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<i32> for Pid {
    #[allow(clippy::cast_sign_loss)]
    fn from(pid: i32) -> Self {
        Pid(pid as u32)
    }
}

/// Goroutine id (`runtime.g.goid`)
///
/// Not to be confused with an OS thread id; goroutines are multiplexed over
/// threads by the Go scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A goroutine decoded from the task registry
///
/// All addresses are virtual addresses in the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    pub stack_lo: u64,
    pub stack_hi: u64,
    /// Saved program counter (`sched.pc`)
    pub pc: u64,
    /// Saved frame pointer (`sched.bp`), 0 when the goroutine has no walkable frame
    pub bp: u64,
}

impl Task {
    /// Size of the goroutine stack in bytes
    #[must_use]
    pub fn stack_size(&self) -> u64 {
        self.stack_hi.saturating_sub(self.stack_lo)
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.status.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_conversion() {
        let pid = Pid::from(1234i32);
        assert_eq!(pid.0, 1234);
        assert_eq!(pid.to_string(), "PID:1234");
    }

    #[test]
    fn test_task_stack_size() {
        let task = Task {
            id: TaskId(7),
            status: TaskStatus::Waiting,
            stack_lo: 0xc000_1000,
            stack_hi: 0xc000_1800,
            pc: 0,
            bp: 0,
        };
        assert_eq!(task.stack_size(), 0x800);
        assert!(!task.is_dead());
        assert_eq!(task.id.to_string(), "7");
    }
}
