//! Structured error types for gscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Pid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Process {0} not found")]
    ProcessNotFound(Pid),

    #[error("Failed to open memory image of process {pid}: {source}")]
    MemoryOpenFailed {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read memory maps of process {pid}: {source}")]
    MemoryMapsParseFailed {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read region 0x{start:x}-0x{end:x}: {source}")]
    RegionReadFailed {
        start: u64,
        end: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse binary {binary}: {reason}")]
    MetadataFailed { binary: String, reason: String },

    #[error("Binary {binary} has no {section} section")]
    MissingSection { binary: String, section: &'static str },

    #[error("Runtime version {0} is older than every known layout")]
    UnsupportedVersion(String),

    #[error("Layout {layout} is missing field {field} in {prototype}")]
    IncompletePrototype { layout: &'static str, prototype: &'static str, field: &'static str },

    #[error("Task registry not found ({candidates} candidates checked with layout {layout})")]
    RegistryNotFound { layout: &'static str, candidates: u64 },

    #[error(transparent)]
    Object(#[from] object::read::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write report file: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
