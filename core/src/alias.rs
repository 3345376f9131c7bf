//! Per-user aliases: a shortcut token standing for a full command line.
//!
//! Expansion is a single substitution of the first token. The expanded line
//! is never expanded again, so `x -> x` or `a -> b, b -> a` cannot loop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alias {
    pub shortcut: String,
    pub expansion: String,
}


/// One user's aliases, keyed case-insensitively by shortcut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, Alias>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = AliasTable::new();
        for (k, v) in pairs {
            table.upsert(k, v);
        }
        table
    }

    pub fn get(&self, shortcut: &str) -> Option<&Alias> {
        self.entries.get(&shortcut.to_lowercase())
    }

    /// Insert or replace one alias. Returns the expansion it replaced.
    pub fn upsert(&mut self, shortcut: impl Into<String>, expansion: impl Into<String>) -> Option<String> {
        let shortcut = shortcut.into();
        let alias = Alias {
            shortcut: shortcut.clone(),
            expansion: expansion.into(),
        };
        self.entries
            .insert(shortcut.to_lowercase(), alias)
            .map(|old| old.expansion)
    }

    pub fn remove(&mut self, shortcut: &str) -> Option<Alias> {
        self.entries.remove(&shortcut.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the first token of `line` with its expansion, keeping the
    /// rest of the line. `None` when the first token is not an alias.
    pub fn expand(&self, line: &str) -> Option<String> {
        let trimmed = line.trim_start();
        let (first, rest) = match trimmed.find(char::is_whitespace) {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };
        if first.is_empty() {
            return None;
        }
        self.get(first)
            .map(|alias| format!("{}{}", alias.expansion, rest))
    }
}
