//! Variable store: Named application variables used by command handlers.
//!
//! Names are case-insensitive single slots. A write looks the name up and
//! updates it if present, otherwise inserts it; concurrent writers to the
//! same name resolve last-writer-wins.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;


/// Read/write access to named variables. Shared by all sessions.
pub trait VariableStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError>;
}


/// In-memory variable store.
#[derive(Debug, Default)]
pub struct MemoryVariableStore {
    /// Lower-cased name -> (name as first written, value).
    data: RwLock<HashMap<String, (String, String)>>,
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        MemoryVariableStore::default()
    }

    /// Seed a store, e.g. from settings.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = values
            .into_iter()
            .map(|(k, v)| {
                let name: String = k.into();
                (name.to_lowercase(), (name, v.into()))
            })
            .collect();
        MemoryVariableStore {
            data: RwLock::new(data),
        }
    }

    /// All variables sorted by name.
    pub fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let data = self.data.read().map_err(|_| poisoned())?;
        let mut list: Vec<(String, String)> = data.values().cloned().collect();
        list.sort();
        Ok(list)
    }
}

fn poisoned() -> StoreError {
    StoreError("variable store lock poisoned".into())
}

impl VariableStore for MemoryVariableStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let data = self.data.read().map_err(|_| poisoned())?;
        Ok(data.get(&name.to_lowercase()).map(|(_, v)| v.clone()))
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        match data.get_mut(&name.to_lowercase()) {
            Some(slot) => slot.1 = value.to_string(),
            None => {
                data.insert(name.to_lowercase(), (name.to_string(), value.to_string()));
            }
        }
        Ok(())
    }
}
