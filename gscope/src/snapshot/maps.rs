//! `/proc/<pid>/maps` parsing
//!
//! Turns the kernel's textual mapping list into [`MapEntry`] values. Parsing
//! is kept separate from reading so the region classifier can be driven by
//! synthetic mapping lists.

use log::debug;
use std::fmt;

/// Permission bits of a mapping (`r-xp`, `rw-s`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub shared: bool,
}

impl Permissions {
    /// Parse the four-character permission column
    #[must_use]
    pub fn parse(perms: &str) -> Option<Self> {
        let bytes = perms.as_bytes();
        if bytes.len() != 4 {
            return None;
        }
        Some(Self {
            read: bytes[0] == b'r',
            write: bytes[1] == b'w',
            execute: bytes[2] == b'x',
            shared: bytes[3] == b's',
        })
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' },
            if self.shared { 's' } else { 'p' },
        )
    }
}

/// One line of `/proc/<pid>/maps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: u64,
    pub end: u64,
    pub perms: Permissions,
    /// Offset into the backing file
    pub offset: u64,
    /// Backing file, pseudo name (`[heap]`, `[stack]`, ...) or empty for anonymous memory
    pub pathname: String,
}

impl MapEntry {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Mapping has no backing file and no pseudo name
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.pathname.is_empty()
    }

    /// Mapping is backed by a file given as an absolute path
    #[must_use]
    pub fn is_file_backed(&self) -> bool {
        self.pathname.starts_with('/')
    }
}

/// Parse a single maps line
///
/// Format: `start-end perms offset dev inode [pathname]`, e.g.
/// `00400000-0047b000 r-xp 00000000 08:01 1234 /usr/local/bin/app`.
/// Anonymous mappings have no pathname column.
#[must_use]
pub fn parse_maps_line(line: &str) -> Option<MapEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }

    let (start, end) = parts[0].split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end < start {
        return None;
    }

    let perms = Permissions::parse(parts[1])?;
    let offset = u64::from_str_radix(parts[2], 16).ok()?;

    Some(MapEntry { start, end, perms, offset, pathname: parts[5..].join(" ") })
}

/// Parse a whole maps file, skipping lines that do not parse
#[must_use]
pub fn parse_maps(content: &str) -> Vec<MapEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = parse_maps_line(line);
            if entry.is_none() {
                debug!("Skipping unparsable maps line: {line}");
            }
            entry
        })
        .collect()
}
