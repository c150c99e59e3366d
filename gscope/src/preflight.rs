//! Pre-flight checks for gscope
//!
//! Validates that the target can be inspected before any memory is read.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use object::{Object, ObjectSection};
use std::path::Path;

/// Run all checks on the target binary
///
/// # Errors
/// Returns an error if the binary is missing, not a file, or has no `.text`
pub fn run_preflight_checks(target_path: &str, quiet: bool) -> Result<()> {
    check_privileges(quiet);
    check_binary_exists(target_path)?;
    check_symbols(target_path, quiet)?;
    Ok(())
}

/// Warn when not root; reading another user's process memory needs ptrace access
fn check_privileges(quiet: bool) {
    if quiet || unsafe { libc::geteuid() } == 0 {
        return;
    }
    eprintln!("warning: not running as root, reading the target's memory may be denied");
}

/// Check if the target binary exists and is a regular file
fn check_binary_exists(target_path: &str) -> Result<()> {
    let path = Path::new(target_path);
    if !path.exists() {
        bail!(
            "Binary not found: {}\n\n\
             Make sure the path is correct and the binary exists.",
            target_path
        );
    }
    if !path.is_file() {
        bail!(
            "Not a file: {}\n\n\
             --target must point to an executable file, not a directory.",
            target_path
        );
    }
    Ok(())
}

/// Check the binary has code and a symbol table to resolve frames against
fn check_symbols(target_path: &str, quiet: bool) -> Result<()> {
    let file_data = std::fs::read(target_path)
        .with_context(|| format!("Failed to read binary: {target_path}"))?;

    let Ok(obj) = object::File::parse(&*file_data) else {
        // Not a valid object file, let metadata extraction report it
        return Ok(());
    };

    if obj.section_by_name(".text").is_none() {
        bail!(
            "No .text section in {target_path}\n\n\
             --target must point to the executable the process is running."
        );
    }

    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);
    if !has_symtab && !quiet {
        eprintln!("warning: binary stripped, frames cannot be symbolized");
    }

    Ok(())
}

/// Check if the target process exists
///
/// # Errors
/// Returns an error if `/proc/<pid>` does not exist
pub fn check_process_exists(pid: i32) -> Result<()> {
    let proc_path = format!("/proc/{pid}");
    if !Path::new(&proc_path).exists() {
        bail!(
            "Process {pid} not found.\n\n\
             Is the process still running? Check with: ps -p {pid}"
        );
    }
    Ok(())
}

/// Check if we can read the process's memory maps
///
/// # Errors
/// Returns an error if `/proc/<pid>/maps` cannot be read
pub fn check_proc_access(pid: i32) -> Result<()> {
    let maps_path = format!("/proc/{pid}/maps");
    std::fs::read_to_string(&maps_path).with_context(|| {
        format!(
            "Cannot read {maps_path}\n\n\
             This usually means:\n\
             - The process doesn't exist (check: ps -p {pid})\n\
             - Permission denied (run with sudo)\n\
             - /proc is not mounted"
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_not_found() {
        let result = check_binary_exists("/nonexistent/path/to/binary");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Binary not found"));
    }

    #[test]
    fn test_directory_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_binary_exists(dir.path().to_str().unwrap()).unwrap_err().to_string();
        assert!(err.contains("Not a file"));
    }

    #[test]
    fn test_own_binary_passes() {
        let exe = std::env::current_exe().unwrap();
        run_preflight_checks(exe.to_str().unwrap(), true).unwrap();
    }

    #[test]
    fn test_non_object_file_is_left_to_later_stages() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"#!/bin/sh\n").unwrap();
        check_symbols(file.path().to_str().unwrap(), true).unwrap();
    }

    #[test]
    fn test_process_not_found() {
        let err = check_process_exists(999_999_999).unwrap_err().to_string();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_own_maps_readable() {
        let pid = i32::try_from(std::process::id()).unwrap();
        check_process_exists(pid).unwrap();
        check_proc_access(pid).unwrap();
    }
}
