//! Global symbol interning.

use std::collections::HashMap;
use std::rc::Rc;

/// Interns symbol names to dense indices. Symbols are never removed;
/// an index stays valid for the life of the table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<Rc<str>>,
    index: HashMap<Rc<str>, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the index for `name`.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len() as u32;
        let name: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&name));
        self.index.insert(name, idx);
        idx
    }

    /// The name for an interned index.
    pub fn name(&self, idx: u32) -> Option<&str> {
        self.names.get(idx as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
