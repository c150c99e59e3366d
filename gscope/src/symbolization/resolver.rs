use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use super::symbol_table::SymbolTable;

/// A program counter resolved against the symbol table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPc {
    pub pc: u64,
    /// Enclosing function, `None` when the pc could not be attributed
    pub function: Option<String>,
    /// Byte offset of the pc from the function entry
    pub offset: u64,
}

impl fmt::Display for ResolvedPc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "{name}+{}", self.offset),
            None => write!(f, "?+0x{:x}", self.pc),
        }
    }
}

/// Resolves program counters to `function+offset`
///
/// Program counters are normalized against `init_addr`, the start of the
/// first text mapping, which is where file offset 0 of the executable is
/// loaded. Results are cached per pc.
pub struct SymbolResolver {
    table: SymbolTable,
    init_addr: Option<u64>,
    cache: RefCell<HashMap<u64, ResolvedPc>>,
}

impl SymbolResolver {
    #[must_use]
    pub fn new(table: SymbolTable, init_addr: Option<u64>) -> Self {
        Self { table, init_addr, cache: RefCell::new(HashMap::new()) }
    }

    /// Resolve `pc`; the same pc always resolves to the same result
    #[must_use]
    pub fn resolve(&self, pc: u64) -> ResolvedPc {
        if let Some(cached) = self.cache.borrow().get(&pc) {
            return cached.clone();
        }

        let resolved = self
            .init_addr
            .and_then(|init| pc.checked_sub(init))
            .and_then(|raw| {
                let symbol = self.table.lookup(raw)?;
                // below the first symbol there is no enclosing function
                let offset = raw.checked_sub(symbol.offset)?;
                Some(ResolvedPc { pc, function: Some(symbol.name.clone()), offset })
            })
            .unwrap_or(ResolvedPc { pc, function: None, offset: 0 });

        self.cache.borrow_mut().insert(pc, resolved.clone());
        resolved
    }

    /// Render `pc` as `name+offset`, or `?+0x<pc>` when unresolvable
    #[must_use]
    pub fn format(&self, pc: u64) -> String {
        self.resolve(pc).to_string()
    }
}
