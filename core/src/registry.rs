//! Command registry: The process-wide table of command descriptors.
//!
//! Built once at startup from the built-in command list and read-only after
//! that, so every session worker can share it behind an `Arc`. Names are
//! unique and looked up case-insensitively.

use std::collections::{BTreeSet, HashMap};

use crate::dispatch::Invocation;
use crate::error::{DispatchError, TerminalError};
use crate::options::OptionSet;


// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

pub const VISITOR: &str = "Visitor";
pub const USER: &str = "User";
pub const MODERATOR: &str = "Moderator";
pub const ADMINISTRATOR: &str = "Administrator";


/// The roles one user holds. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    names: BTreeSet<String>,
}

impl RoleSet {
    pub fn new() -> Self {
        RoleSet::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RoleSet {
            names: names.into_iter().map(|n| n.as_ref().to_string()).collect(),
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(role))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}


/// Who may invoke a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Anyone, including users with no roles at all.
    Everyone,
    /// Users holding at least one of these roles.
    AnyOf(&'static [&'static str]),
}

impl RoleRequirement {
    pub fn permits(&self, roles: &RoleSet) -> bool {
        match self {
            RoleRequirement::Everyone => true,
            RoleRequirement::AnyOf(allowed) => allowed.iter().any(|r| roles.contains(r)),
        }
    }
}


/// Common role requirements.
pub struct RoleTemplates;

impl RoleTemplates {
    pub const EVERYONE: RoleRequirement = RoleRequirement::Everyone;
    pub const VISITOR: RoleRequirement = RoleRequirement::AnyOf(&[VISITOR]);
    pub const ONLY_USERS: RoleRequirement = RoleRequirement::AnyOf(&[USER]);
    pub const MODS_AND_USERS: RoleRequirement = RoleRequirement::AnyOf(&[USER, MODERATOR]);
    pub const ALL_LOGGED_IN: RoleRequirement =
        RoleRequirement::AnyOf(&[USER, MODERATOR, ADMINISTRATOR]);
    pub const ADMINISTRATORS: RoleRequirement = RoleRequirement::AnyOf(&[ADMINISTRATOR]);
}


// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// A command handler. It reads its arguments from the invocation, writes
/// output lines, and may move the session context.
pub type Handler = fn(&mut Invocation<'_>) -> Result<(), DispatchError>;


/// Everything the terminal knows about one command.
#[derive(Clone)]
pub struct CommandDescriptor {
    /// Canonical (upper-case) name.
    pub name: &'static str,
    pub roles: RoleRequirement,
    /// Usage string, e.g. `[Option(s)]` or `<name> [--set]`.
    pub parameters: &'static str,
    pub description: &'static str,
    /// Hidden commands stay invocable but are left out of help listings.
    pub show_help: bool,
    /// The option schema, for help output.
    pub options: fn() -> OptionSet,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("show_help", &self.show_help)
            .finish()
    }
}


// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CommandRegistry {
    /// Upper-cased name -> descriptor.
    commands: HashMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    /// Build a registry. Two descriptors with the same name (ignoring case)
    /// are rejected.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = CommandDescriptor>,
    ) -> Result<CommandRegistry, TerminalError> {
        let mut commands = HashMap::new();
        for descriptor in descriptors {
            let key = descriptor.name.to_ascii_uppercase();
            if commands.contains_key(&key) {
                return Err(TerminalError::DuplicateCommand(key));
            }
            commands.insert(key, descriptor);
        }
        Ok(CommandRegistry { commands })
    }

    /// The registry of built-in commands.
    pub fn standard() -> Result<CommandRegistry, TerminalError> {
        Self::from_descriptors(crate::commands::builtin())
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look a command up and check the caller may run it.
    ///
    /// Unknown names fail with `UnknownCommand`; known names the caller may
    /// not run fail with the generic `Unauthorized`.
    pub fn authorize(&self, name: &str, roles: &RoleSet) -> Result<&CommandDescriptor, DispatchError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownCommand(name.to_ascii_uppercase()))?;
        if descriptor.roles.permits(roles) {
            Ok(descriptor)
        } else {
            Err(DispatchError::Unauthorized)
        }
    }

    /// Commands the caller may run, hidden ones included, sorted by name.
    pub fn available(&self, roles: &RoleSet) -> Vec<&CommandDescriptor> {
        let mut list: Vec<&CommandDescriptor> = self
            .commands
            .values()
            .filter(|d| d.roles.permits(roles))
            .collect();
        list.sort_by_key(|d| d.name);
        list
    }

    /// Commands the caller may run and that show up in help, sorted by name.
    pub fn visible(&self, roles: &RoleSet) -> Vec<&CommandDescriptor> {
        self.available(roles)
            .into_iter()
            .filter(|d| d.show_help)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
