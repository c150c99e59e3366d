//! Binary metadata extraction
//!
//! The registry scan and symbolization need three things from the target's
//! executable: its function symbols, the Go release it was built with (to
//! pick a layout), and where `.text` sits in the file. [`MetadataSource`] is
//! the seam; [`ElfMetadata`] reads them from an ELF file with `object`.

use log::{debug, info};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::InspectError;

/// A function as reported by the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Entry virtual address
    pub entry: u64,
    /// First virtual address past the function
    pub end: u64,
    /// Fully qualified name, e.g. `net/http.(*Server).Serve`
    pub name: String,
}

/// Load address and file offset of the `.text` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextSection {
    pub address: u64,
    pub file_offset: u64,
}

/// Everything gscope needs from the target's executable
#[derive(Debug, Clone, Default)]
pub struct BinaryMetadata {
    /// Runtime version string such as `go1.21.5`, empty if not found
    pub version: String,
    pub functions: Vec<Function>,
    pub text: TextSection,
}

/// Source of binary metadata
pub trait MetadataSource {
    /// # Errors
    /// Returns an error if the binary cannot be read or lacks the expected sections
    fn extract(&self) -> Result<BinaryMetadata, InspectError>;
}

/// Already extracted metadata passes through unchanged
impl MetadataSource for BinaryMetadata {
    fn extract(&self) -> Result<BinaryMetadata, InspectError> {
        Ok(self.clone())
    }
}

/// Metadata read from an ELF executable's symbol table
#[derive(Debug, Clone)]
pub struct ElfMetadata {
    path: PathBuf,
}

impl ElfMetadata {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Parse metadata from ELF bytes; `binary` names the file in errors
    ///
    /// # Errors
    /// Returns an error if the bytes are not an object file, `.text` is
    /// missing, or there are no function symbols (stripped binary)
    pub fn parse(data: &[u8], binary: &str) -> Result<BinaryMetadata, InspectError> {
        let obj = object::File::parse(data)?;

        let section = obj
            .section_by_name(".text")
            .ok_or_else(|| InspectError::MissingSection { binary: binary.to_string(), section: ".text" })?;
        let (file_offset, _) = section
            .file_range()
            .ok_or_else(|| InspectError::MissingSection { binary: binary.to_string(), section: ".text" })?;
        let text = TextSection { address: section.address(), file_offset };

        let functions: Vec<Function> = obj
            .symbols()
            .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.is_definition())
            .filter_map(|symbol| {
                let name = symbol.name().ok()?;
                Some(Function {
                    entry: symbol.address(),
                    end: symbol.address().saturating_add(symbol.size()),
                    name: name.to_string(),
                })
            })
            .collect();
        if functions.is_empty() {
            return Err(InspectError::MetadataFailed {
                binary: binary.to_string(),
                reason: "no function symbols (stripped binary?)".to_string(),
            });
        }

        let version = obj
            .section_by_name(".go.buildinfo")
            .and_then(|section| section.data().ok())
            .and_then(buildinfo_version)
            .or_else(|| scan_version(data))
            .unwrap_or_default();

        debug!(".text at 0x{:x} (file offset 0x{:x})", text.address, text.file_offset);
        Ok(BinaryMetadata { version, functions, text })
    }
}

impl MetadataSource for ElfMetadata {
    fn extract(&self) -> Result<BinaryMetadata, InspectError> {
        let binary = self.path.display().to_string();
        let data = fs::read(&self.path)?;
        let metadata = Self::parse(&data, &binary)?;
        info!(
            "{binary}: {} functions, runtime {}",
            metadata.functions.len(),
            if metadata.version.is_empty() { "unknown" } else { &metadata.version }
        );
        Ok(metadata)
    }
}

/// Header magic of the `.go.buildinfo` section
const BUILDINFO_MAGIC: &[u8] = b"\xff Go buildinf:";

/// Header size; inline version strings start right after it
const BUILDINFO_HEADER_LEN: usize = 32;

/// Flag set since go1.18 when version and module info are stored inline
const BUILDINFO_INLINE_STRINGS: u8 = 0x2;

/// Read the version string from a `.go.buildinfo` section
///
/// Only the inline-string format (go1.18+) is decoded; older binaries
/// store pointers and fall through to [`scan_version`].
#[must_use]
pub fn buildinfo_version(section: &[u8]) -> Option<String> {
    if !section.starts_with(BUILDINFO_MAGIC) || section.len() < BUILDINFO_HEADER_LEN {
        return None;
    }
    if section[15] & BUILDINFO_INLINE_STRINGS == 0 {
        return None;
    }

    let (len, used) = read_uvarint(&section[BUILDINFO_HEADER_LEN..])?;
    let start = BUILDINFO_HEADER_LEN + used;
    let bytes = section.get(start..start.checked_add(usize::try_from(len).ok()?)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Decode an unsigned LEB128 varint, returning the value and bytes consumed
fn read_uvarint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Find the first `go1.<digits>[.<digits>]` string anywhere in the file
///
/// The version is neither NUL-terminated nor length-prefixed, so it ends at
/// the first character that is not a digit or a dot followed by a digit.
#[must_use]
pub fn scan_version(data: &[u8]) -> Option<String> {
    const NEEDLE: &[u8] = b"go1.";
    const MAX_TAIL: usize = 6;

    data.windows(NEEDLE.len())
        .enumerate()
        .filter(|(_, window)| *window == NEEDLE)
        .find_map(|(idx, _)| {
            let tail_start = idx + NEEDLE.len();
            let tail = &data[tail_start..(tail_start + MAX_TAIL).min(data.len())];
            version_tail(tail).map(|rest| format!("go1.{rest}"))
        })
}

/// Leading `<digits>[.<digits>]` of `tail`, `None` if it does not start with a digit
fn version_tail(tail: &[u8]) -> Option<String> {
    if !tail.first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let mut version = String::new();
    for (i, &c) in tail.iter().enumerate() {
        let next_is_digit = tail.get(i + 1).is_some_and(u8::is_ascii_digit);
        if c.is_ascii_digit() || (c == b'.' && next_is_digit) {
            version.push(char::from(c));
        } else {
            break;
        }
    }
    Some(version)
}
