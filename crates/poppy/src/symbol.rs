// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! Global, append-only string interning for the Symbol wide tag. A
//! procedure's name (header offset −3) is a symbol cell; the index it
//! carries names an entry here.

#[cfg(test)]
mod symbol_test;

use std::collections::HashMap;

/// Interns strings and hands back stable, densely-packed indices.
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    by_name: HashMap<String, u64>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its (possibly pre-existing) index.
    pub fn intern(&mut self, name: &str) -> u64 {
        if let Some(&idx) = self.by_name.get(name) {
            return idx;
        }
        let idx = self.names.len() as u64;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), idx);
        idx
    }

    #[must_use]
    pub fn name(&self, index: u64) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }
}
