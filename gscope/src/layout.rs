//! Struct prototype registry
//!
//! A [`Prototype`] maps field names to `(offset, size)` inside one foreign
//! structure. A [`LayoutSet`] bundles the two prototypes gscope needs (the
//! goroutine descriptor and the `allgs` slice header) for one runtime
//! version. Layout sets are plain values handed to the scanner, so several
//! versions can be used side by side.
//!
//! Completeness is checked once, when a layout set is built. After that a
//! field lookup can only miss through a programming error.

use gscope_common::{registry_fields, task_fields, FieldSpec, LayoutTable, LAYOUTS};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

use crate::domain::InspectError;

/// Offset and width of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: u64,
    pub size: u64,
}

/// Field layout of one foreign structure
#[derive(Debug, Clone)]
pub struct Prototype {
    name: &'static str,
    fields: HashMap<&'static str, Field>,
}

impl Prototype {
    #[must_use]
    pub fn new(name: &'static str, specs: &[FieldSpec]) -> Self {
        let fields = specs
            .iter()
            .map(|spec| (spec.name, Field { offset: spec.offset, size: spec.size }))
            .collect();
        Self { name, fields }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields.get(name).copied()
    }

    fn require(&self, layout: &'static str, required: &[&'static str]) -> Result<(), InspectError> {
        match required.iter().copied().find(|name| !self.fields.contains_key(name)) {
            Some(field) => {
                Err(InspectError::IncompletePrototype { layout, prototype: self.name, field })
            }
            None => Ok(()),
        }
    }
}

/// `(major, minor)` of a Go release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GoVersion {
    pub major: u32,
    pub minor: u32,
}

impl GoVersion {
    /// Parse the version out of strings such as `go1.21.5`, `go1.23rc1`,
    /// `devel go1.24-3f2a1b Mon Jan 1` or a bare `1.22.0`
    #[must_use]
    pub fn parse(version: &str) -> Option<Self> {
        let rest = version.find("go").map_or(version, |idx| &version[idx + 2..]);
        let (major, rest) = leading_number(rest)?;
        let rest = rest.strip_prefix('.')?;
        let (minor, _) = leading_number(rest)?;
        Some(Self { major, minor })
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go{}.{}", self.major, self.minor)
    }
}

fn leading_number(s: &str) -> Option<(u32, &str)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let value = s[..digits].parse().ok()?;
    Some((value, &s[digits..]))
}

/// The prototypes active for one runtime version
#[derive(Debug, Clone)]
pub struct LayoutSet {
    label: &'static str,
    task: Prototype,
    registry: Prototype,
}

impl LayoutSet {
    /// Bundle two prototypes, checking they define every field gscope reads
    ///
    /// # Errors
    /// Returns [`InspectError::IncompletePrototype`] naming the first missing field
    pub fn new(
        label: &'static str,
        task: Prototype,
        registry: Prototype,
    ) -> Result<Self, InspectError> {
        task.require(label, task_fields::REQUIRED)?;
        registry.require(label, registry_fields::REQUIRED)?;
        Ok(Self { label, task, registry })
    }

    /// Build from one of the static tables
    ///
    /// # Errors
    /// Returns an error if the table is incomplete
    pub fn from_table(table: &LayoutTable) -> Result<Self, InspectError> {
        Self::new(
            table.label,
            Prototype::new("runtime.g", table.task),
            Prototype::new("runtime.allgs", table.registry),
        )
    }

    /// Pick the newest table whose minimum version is not above `version`
    ///
    /// An unparsable version falls back to the newest table; if that is the
    /// wrong layout the registry scan will come up empty rather than misread.
    ///
    /// # Errors
    /// Returns [`InspectError::UnsupportedVersion`] for releases older than every table
    pub fn for_version(version: &str) -> Result<Self, InspectError> {
        let Some(parsed) = GoVersion::parse(version) else {
            warn!("Unrecognized runtime version {version:?}, assuming the newest layout");
            return Self::newest();
        };

        let table = LAYOUTS
            .iter()
            .rev()
            .find(|table| table.min_version <= (parsed.major, parsed.minor))
            .ok_or_else(|| InspectError::UnsupportedVersion(version.to_string()))?;
        debug!("Runtime {parsed} uses layout {}", table.label);
        Self::from_table(table)
    }

    /// The layout of the most recent known release
    ///
    /// # Errors
    /// Returns an error if the newest table is incomplete
    pub fn newest() -> Result<Self, InspectError> {
        let table = LAYOUTS.last().ok_or_else(|| InspectError::UnsupportedVersion(String::new()))?;
        Self::from_table(table)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Prototype of the goroutine descriptor
    #[must_use]
    pub fn task(&self) -> &Prototype {
        &self.task
    }

    /// Prototype of the task registry header
    #[must_use]
    pub fn registry(&self) -> &Prototype {
        &self.registry
    }
}
