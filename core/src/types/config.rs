use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};


/// One user in the in-memory directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}


/// Runtime settings, read from `<config_dir>/terminal.yaml`.
/// Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub socket_name: String,
    pub pid_name: String,
    pub max_frame_bytes: usize,
    pub socket_poll_ms: u64,
    pub request_timeout_ms: u64,
    pub help_page_size: usize,
    /// Roles given to users who are not in `users`.
    pub guest_roles: Vec<String>,
    pub log_level: String,
    pub users: Vec<UserConfig>,
    pub variables: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            socket_name: "terminal.sock".into(),
            pid_name: "terminal.pid".into(),
            max_frame_bytes: 1024 * 1024,
            socket_poll_ms: 50,
            request_timeout_ms: 10_000,
            help_page_size: 10,
            guest_roles: vec!["Visitor".into()],
            log_level: "info".into(),
            users: Vec::new(),
            variables: BTreeMap::new(),
        }
    }
}
