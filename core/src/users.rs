//! User directory: Supplies each request's role set and alias table.
//!
//! Credentials are not handled here: a session names its user at login and
//! the directory answers with that user's roles. Users missing from the
//! directory get the configured guest roles and no aliases.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::alias::AliasTable;
use crate::error::StoreError;
use crate::registry::RoleSet;
use crate::types::config::{Settings, UserConfig};


pub trait UserStore: Send + Sync {
    /// True when the user has an account (as opposed to a guest).
    fn is_known(&self, user: &str) -> bool;
    fn roles(&self, user: &str) -> RoleSet;
    fn aliases(&self, user: &str) -> AliasTable;
    /// Insert or replace one alias. Returns the expansion it replaced.
    fn set_alias(&self, user: &str, shortcut: &str, expansion: &str) -> Result<Option<String>, StoreError>;
    /// Remove one alias. Returns false when there was none.
    fn remove_alias(&self, user: &str, shortcut: &str) -> Result<bool, StoreError>;
}


#[derive(Debug, Clone)]
struct UserRecord {
    roles: RoleSet,
    aliases: AliasTable,
}


/// In-memory user directory. Each user's record is updated under the
/// directory lock, one key at a time.
#[derive(Debug)]
pub struct MemoryUserStore {
    guest_roles: RoleSet,
    /// Lower-cased user name -> record.
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new(guest_roles: RoleSet) -> Self {
        MemoryUserStore {
            guest_roles,
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let store = MemoryUserStore::new(RoleSet::from_names(&settings.guest_roles));
        for user in &settings.users {
            store.insert(user);
        }
        store
    }

    /// Add or replace a user.
    pub fn insert(&self, user: &UserConfig) {
        let record = UserRecord {
            roles: RoleSet::from_names(&user.roles),
            aliases: AliasTable::from_pairs(user.aliases.clone()),
        };
        if let Ok(mut users) = self.users.write() {
            users.insert(user.name.to_lowercase(), record);
        }
    }

    fn record(&self, user: &str) -> Option<UserRecord> {
        self.users
            .read()
            .ok()
            .and_then(|users| users.get(&user.to_lowercase()).cloned())
    }
}

fn poisoned() -> StoreError {
    StoreError("user directory lock poisoned".into())
}

impl UserStore for MemoryUserStore {
    fn is_known(&self, user: &str) -> bool {
        self.record(user).is_some()
    }

    fn roles(&self, user: &str) -> RoleSet {
        self.record(user)
            .map(|r| r.roles)
            .unwrap_or_else(|| self.guest_roles.clone())
    }

    fn aliases(&self, user: &str) -> AliasTable {
        self.record(user).map(|r| r.aliases).unwrap_or_default()
    }

    fn set_alias(&self, user: &str, shortcut: &str, expansion: &str) -> Result<Option<String>, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users
            .get_mut(&user.to_lowercase())
            .ok_or_else(|| StoreError(format!("no account named '{}'", user)))?;
        Ok(record.aliases.upsert(shortcut, expansion))
    }

    fn remove_alias(&self, user: &str, shortcut: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users
            .get_mut(&user.to_lowercase())
            .ok_or_else(|| StoreError(format!("no account named '{}'", user)))?;
        Ok(record.aliases.remove(shortcut).is_some())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn store() -> MemoryUserStore {
        let mut settings = Settings::default();
        settings.users.push(UserConfig {
            name: "Alice".into(),
            roles: vec!["User".into()],
            aliases: BTreeMap::from([("h".to_string(), "HELP".to_string())]),
        });
        MemoryUserStore::from_settings(&settings)
    }

    #[test]
    fn known_user_roles_and_aliases() {
        let users = store();
        assert!(users.is_known("alice"));
        assert!(users.roles("ALICE").contains("user"));
        assert_eq!(users.aliases("alice").get("h").unwrap().expansion, "HELP");
    }

    #[test]
    fn guests_get_guest_roles() {
        let users = store();
        assert!(!users.is_known("mallory"));
        let roles = users.roles("mallory");
        assert!(roles.contains("Visitor"));
        assert!(!roles.contains("User"));
        assert!(users.aliases("mallory").is_empty());
    }

    #[test]
    fn alias_upsert_and_remove() {
        let users = store();
        assert_eq!(users.set_alias("alice", "s", "SAMPLE --count=2").unwrap(), None);
        assert_eq!(
            users.set_alias("alice", "S", "SAMPLE --count=3").unwrap().as_deref(),
            Some("SAMPLE --count=2")
        );
        assert!(users.remove_alias("alice", "s").unwrap());
        assert!(!users.remove_alias("alice", "s").unwrap());
    }

    #[test]
    fn guests_cannot_store_aliases() {
        let users = store();
        assert!(users.set_alias("mallory", "x", "HELP").is_err());
    }
}
