//! # Symbol Resolution
//!
//! Turns the raw program counters collected by the stack walker into
//! `function+offset` strings using nothing but the executable's symbol table.
//! Go binaries always carry one unless explicitly stripped, and no DWARF is
//! needed.
//!
//! ## Address Translation
//!
//! Symbol addresses in the ELF file are link-time virtual addresses, while
//! the walker produces run-time addresses. Both are normalized to **file
//! offsets**:
//!
//! ```text
//! symbol:  offset = entry - text.address + text.file_offset
//! pc:      offset = pc - init_addr
//! ```
//!
//! `init_addr` is the start of the first text mapping in `/proc/<pid>/maps`,
//! where file offset 0 is loaded. For a non-PIE Go binary this is the link
//! base (`0x400000`); for a PIE binary it absorbs the ASLR slide.
//!
//! ## Lookup
//!
//! A pc belongs to the symbol with the greatest offset not above it. Function
//! sizes are ignored, so a pc in padding between two functions resolves to
//! the preceding one.
//!
//! ```text
//! offsets:   0x1000 gopark     0x1800 worker
//! pc 0x401810 -> raw 0x1810 -> worker+16
//! pc 0x000123 -> below init_addr -> ?+0x123
//! ```
//!
//! ## Module Structure
//!
//! - **`metadata`**: the [`MetadataSource`] seam and ELF extraction with `object`
//! - **`symbol_table`**: sorted offsets with nearest-below lookup
//! - **`resolver`**: pc normalization, formatting and caching

pub mod metadata;
pub mod resolver;
pub mod symbol_table;

pub use metadata::{BinaryMetadata, ElfMetadata, Function, MetadataSource, TextSection};
pub use resolver::{ResolvedPc, SymbolResolver};
pub use symbol_table::{Symbol, SymbolTable};
