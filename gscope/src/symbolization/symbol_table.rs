//! Function symbol table with nearest-below lookup

use log::debug;

use super::metadata::{Function, TextSection};

/// A function entry point as a file-relative offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub offset: u64,
    pub name: String,
}

/// Symbols sorted by offset, duplicates allowed
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Sort `symbols` by offset; equal offsets keep their input order
    #[must_use]
    pub fn new(mut symbols: Vec<Symbol>) -> Self {
        symbols.sort_by_key(|symbol| symbol.offset);
        Self { symbols }
    }

    /// Normalize function entry addresses to file offsets
    ///
    /// `offset = entry - text.address + text.file_offset`. Functions below the
    /// text section cannot be normalized and are skipped.
    #[must_use]
    pub fn from_functions(functions: &[Function], text: TextSection) -> Self {
        let mut skipped = 0usize;
        let symbols = functions
            .iter()
            .filter_map(|function| {
                let offset = function
                    .entry
                    .checked_sub(text.address)
                    .and_then(|rel| rel.checked_add(text.file_offset));
                if offset.is_none() {
                    skipped += 1;
                }
                offset.map(|offset| Symbol { offset, name: function.name.clone() })
            })
            .collect();

        if skipped > 0 {
            debug!("Skipped {skipped} functions outside the text section");
        }
        Self::new(symbols)
    }

    /// Symbol with the greatest offset `<= offset`
    ///
    /// Offsets below the first symbol resolve to the first symbol and offsets
    /// past the last resolve to the last. `None` only for an empty table.
    #[must_use]
    pub fn lookup(&self, offset: u64) -> Option<&Symbol> {
        let pos = self.symbols.partition_point(|symbol| symbol.offset <= offset);
        self.symbols.get(pos.saturating_sub(1))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}
