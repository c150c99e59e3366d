//! Goroutine report rendering and export
//!
//! A [`Report`] is the final product of an inspection: every task with its
//! symbolized frames. It renders as a traceback-like text listing or as JSON.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{ExportError, Task};

/// One goroutine and its call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: u64,
    /// Runtime status name, e.g. `waiting`
    pub status: String,
    /// Symbolized frames, innermost first
    pub frames: Vec<String>,
}

impl TaskReport {
    #[must_use]
    pub fn new(task: &Task, frames: Vec<String>) -> Self {
        Self { id: task.id.0, status: task.status.name().to_string(), frames }
    }
}

/// Result of inspecting one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Runtime version the layout was chosen for
    pub version: String,
    /// Label of the layout tables used
    pub layout: String,
    /// Address of the task registry header
    pub registry_address: u64,
    /// Tasks in registry order
    pub tasks: Vec<TaskReport>,
}

impl Report {
    /// Write the traceback-style text listing
    ///
    /// ```text
    /// -- Goroutine 1: waiting
    ///   runtime.gopark+214
    ///   main.main+64
    /// ```
    ///
    /// # Errors
    /// Returns an error if writing fails
    pub fn write_text<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        for task in &self.tasks {
            writeln!(writer, "-- Goroutine {}: {}", task.id, task.status)?;
            for frame in &task.frames {
                writeln!(writer, "  {frame}")?;
            }
        }
        Ok(())
    }

    /// Write the report as pretty-printed JSON
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    /// Write the JSON report to `path`
    ///
    /// # Errors
    /// Returns [`ExportError::WriteFailed`] if the file cannot be created
    pub fn export(&self, path: &Path) -> Result<(), ExportError> {
        let file = File::create(path)
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        let mut writer = BufWriter::new(file);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
