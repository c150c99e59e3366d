//! Access to a live process's address space through procfs
//!
//! Reads go through `/proc/<pid>/mem` with positional reads. The target is
//! never stopped or traced; the kernel only requires ptrace-read access
//! permission, which the same user (or root) has.

use log::debug;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use super::maps::{parse_maps, MapEntry};
use crate::domain::{InspectError, Pid};

/// Read-only view of a process's memory image
///
/// This is the operating-system seam: [`ProcImage`] implements it over
/// procfs, tests implement it over in-memory buffers.
pub trait ProcessImage {
    /// Current mappings in address order
    ///
    /// # Errors
    /// Returns an error if the mapping list cannot be enumerated
    fn mappings(&self) -> Result<Vec<MapEntry>, InspectError>;

    /// Read exactly `len` bytes at `address`
    ///
    /// # Errors
    /// Returns an error if any byte of the range cannot be read
    fn read_at(&self, address: u64, len: u64) -> io::Result<Vec<u8>>;
}

/// Memory image of a live process backed by `/proc/<pid>/{maps,mem}`
///
/// The `mem` handle is opened once and held for the lifetime of the value.
#[derive(Debug)]
pub struct ProcImage {
    pid: Pid,
    maps_path: PathBuf,
    mem: File,
}

impl ProcImage {
    /// Open the memory image of `pid` under `/proc`
    ///
    /// # Errors
    /// Returns an error if the process does not exist or its memory cannot be opened
    pub fn open(pid: Pid) -> Result<Self, InspectError> {
        Self::open_in(Path::new("/proc"), pid)
    }

    /// Open the memory image of `pid` under an alternative procfs root
    ///
    /// # Errors
    /// Returns an error if `<root>/<pid>` does not exist or `mem` cannot be opened
    pub fn open_in(root: &Path, pid: Pid) -> Result<Self, InspectError> {
        let proc_dir = root.join(pid.0.to_string());
        if !proc_dir.is_dir() {
            return Err(InspectError::ProcessNotFound(pid));
        }

        let mem = File::open(proc_dir.join("mem"))
            .map_err(|source| InspectError::MemoryOpenFailed { pid, source })?;
        debug!("Opened {}", proc_dir.join("mem").display());

        Ok(Self { pid, maps_path: proc_dir.join("maps"), mem })
    }
}

impl ProcessImage for ProcImage {
    fn mappings(&self) -> Result<Vec<MapEntry>, InspectError> {
        let content = fs::read_to_string(&self.maps_path).map_err(|source| {
            debug!("Reading {} failed: {source}", self.maps_path.display());
            InspectError::MemoryMapsParseFailed { pid: self.pid, source }
        })?;
        Ok(parse_maps(&content))
    }

    fn read_at(&self, address: u64, len: u64) -> io::Result<Vec<u8>> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "region too large"))?;
        let mut buf = vec![0u8; len];
        self.mem.read_exact_at(&mut buf, address)?;
        Ok(buf)
    }
}
