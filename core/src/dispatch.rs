//! Dispatcher: Decides, for one input line of one session, what runs.
//!
//! # Resolution order
//!
//! 1. **Forced context**: The contexted command and args are reused and the
//!    raw line becomes the next `prompt_data` entry. A bare `CANCEL` is the
//!    one escape: it unwinds the prompt instead of being recorded.
//! 2. **Alias**: The first token is expanded once through the user's
//!    alias table.
//! 3. **Tokenize**: The line is split into a command name and args.
//! 4. **Passive fallback**: In a Passive context, a first token that is not
//!    a registered command is appended to the contexted command's args.
//! 5. **Lookup + authorize**: Case-insensitive lookup, then the role check.
//! 6. **Invoke**: The handler runs with the live context; whatever it
//!    leaves in the context stays there.
//!
//! Every `DispatchError` becomes one output line. Failures in steps 1-5
//! leave the context untouched.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::commands::CANCEL;
use crate::context::{ContextStatus, SessionContext};
use crate::error::{DispatchError, TerminalError};
use crate::options::{tokenize, OptionSet, ParsedOptions};
use crate::output::{CommandResult, DisplayDirective};
use crate::registry::{CommandDescriptor, CommandRegistry, RoleSet};
use crate::session::Session;
use crate::store::{MemoryVariableStore, VariableStore};
use crate::types::config::Settings;
use crate::types::protocol::Response;
use crate::users::{MemoryUserStore, UserStore};


// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Everything one handler call may see or touch. Built per request; nothing
/// in here outlives it.
pub struct Invocation<'a> {
    pub command: &'a CommandDescriptor,
    pub args: &'a [String],
    pub user: &'a str,
    pub roles: &'a RoleSet,
    pub context: &'a mut SessionContext,
    pub output: &'a mut CommandResult,
    pub registry: &'a CommandRegistry,
    pub variables: &'a dyn VariableStore,
    pub users: &'a dyn UserStore,
    pub help_page_size: usize,
}

impl Invocation<'_> {
    pub fn name(&self) -> &'static str {
        self.command.name
    }

    /// Parse this invocation's args against the command's option set.
    pub fn parse(&self, options: &OptionSet) -> Result<ParsedOptions, DispatchError> {
        options.parse(self.args)
    }

    pub fn write_line(&mut self, text: impl Into<String>) {
        self.output.write_line(text);
    }

    /// Enter (or stay in) prompt mode for this command with the same args.
    pub fn prompt(&mut self, text: &str) {
        let args = self.args.to_vec();
        self.context.set_prompt(self.command.name, &args, text);
    }
}


// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// What one request produced, plus the prompt state the client should show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub output: Vec<DisplayDirective>,
    pub prompt: Option<String>,
    pub prompt_active: bool,
}

impl Reply {
    pub fn texts(&self) -> Vec<&str> {
        self.output.iter().map(|d| d.text.as_str()).collect()
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Response {
        Response::Ok {
            output: reply.output,
            prompt: reply.prompt,
            prompt_active: reply.prompt_active,
        }
    }
}


// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Shared by every session worker. Holds only read-only or internally
/// synchronized collaborators.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    users: Arc<dyn UserStore>,
    variables: Arc<dyn VariableStore>,
    help_page_size: usize,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        users: Arc<dyn UserStore>,
        variables: Arc<dyn VariableStore>,
        help_page_size: usize,
    ) -> Dispatcher {
        Dispatcher {
            registry,
            users,
            variables,
            help_page_size: help_page_size.max(1),
        }
    }

    /// Built-in commands with in-memory stores seeded from settings.
    pub fn from_settings(settings: &Settings) -> Result<Dispatcher, TerminalError> {
        let registry = Arc::new(CommandRegistry::standard()?);
        let users = Arc::new(MemoryUserStore::from_settings(settings));
        let variables = Arc::new(MemoryVariableStore::with_values(settings.variables.clone()));
        Ok(Dispatcher::new(registry, users, variables, settings.help_page_size))
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn variables(&self) -> &dyn VariableStore {
        self.variables.as_ref()
    }

    /// Run one input line for one session.
    pub fn handle(&self, session: &mut Session, line: &str) -> Reply {
        let roles = self.users.roles(&session.user);
        let mut output = CommandResult::new();

        if let Err(e) = self.dispatch(session, &roles, line, &mut output) {
            match &e {
                DispatchError::HandlerRuntime(msg) => {
                    warn!(session = session.id, user = %session.user, error = %msg, "handler failed")
                }
                other => debug!(session = session.id, user = %session.user, error = %other, "request rejected"),
            }
            output.write_line(e.to_string());
        }

        Reply {
            output: output.into_lines(),
            prompt: session.context.display_text().map(str::to_string),
            prompt_active: session.context.prompt_active(),
        }
    }

    fn dispatch(
        &self,
        session: &mut Session,
        roles: &RoleSet,
        line: &str,
        output: &mut CommandResult,
    ) -> Result<(), DispatchError> {
        if session.context.status() == ContextStatus::Forced {
            return self.continue_forced(session, roles, line, output);
        }

        let aliases = self.users.aliases(&session.user);
        let expanded = match aliases.expand(line) {
            Some(expansion) => {
                debug!(session = session.id, from = line, to = %expansion, "alias expanded");
                expansion
            }
            None => line.to_string(),
        };

        let tokens = tokenize(&expanded)?;
        let Some((name, args)) = tokens.split_first() else {
            return Ok(());
        };

        if session.context.status() == ContextStatus::Passive && !self.registry.contains(name) {
            if let Some(contexted) = session.context.command().map(str::to_string) {
                let descriptor = self.registry.authorize(&contexted, roles)?;
                let mut passive_args = session.context.args().to_vec();
                passive_args.extend(tokens.iter().cloned());
                debug!(session = session.id, command = descriptor.name, "passive fallback");
                return self.invoke(descriptor, &passive_args, session, roles, output);
            }
        }

        let descriptor = self.registry.authorize(name, roles)?;
        debug!(session = session.id, command = descriptor.name, "dispatch");
        self.invoke(descriptor, args, session, roles, output)
    }

    fn continue_forced(
        &self,
        session: &mut Session,
        roles: &RoleSet,
        line: &str,
        output: &mut CommandResult,
    ) -> Result<(), DispatchError> {
        if line.trim().eq_ignore_ascii_case(CANCEL) {
            let descriptor = self.registry.authorize(CANCEL, roles)?;
            return self.invoke(descriptor, &[], session, roles, output);
        }

        let contexted = session
            .context
            .command()
            .map(str::to_string)
            .ok_or_else(|| DispatchError::runtime("forced context has no command"))?;
        let descriptor = self.registry.authorize(&contexted, roles)?;
        let args = session.context.args().to_vec();

        // The answer is recorded before the handler sees it; an argument
        // error puts the prompt back as it was.
        let before = session.context.clone();
        session.context.push_prompt_entry(line);
        debug!(
            session = session.id,
            command = descriptor.name,
            step = session.context.prompt_data().len(),
            "forced continuation"
        );
        let result = self.invoke(descriptor, &args, session, roles, output);
        if matches!(result, Err(DispatchError::ArgumentParse(_))) {
            session.context = before;
        }
        result
    }

    fn invoke(
        &self,
        descriptor: &CommandDescriptor,
        args: &[String],
        session: &mut Session,
        roles: &RoleSet,
        output: &mut CommandResult,
    ) -> Result<(), DispatchError> {
        let mut invocation = Invocation {
            command: descriptor,
            args,
            user: &session.user,
            roles,
            context: &mut session.context,
            output,
            registry: &self.registry,
            variables: self.variables.as_ref(),
            users: self.users.as_ref(),
            help_page_size: self.help_page_size,
        };
        (descriptor.handler)(&mut invocation)
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RoleTemplates, ADMINISTRATOR};
    use crate::types::config::UserConfig;
    use std::collections::BTreeMap;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.help_page_size = 2;
        settings.users = vec![
            UserConfig {
                name: "alice".into(),
                roles: vec!["User".into()],
                aliases: BTreeMap::from([
                    ("c3".to_string(), "SAMPLE --count=3".to_string()),
                    ("x".to_string(), "x".to_string()),
                    ("loop".to_string(), "c3".to_string()),
                ]),
            },
            UserConfig {
                name: "sysop".into(),
                roles: vec![ADMINISTRATOR.into()],
                aliases: BTreeMap::new(),
            },
        ];
        settings
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::from_settings(&settings()).unwrap()
    }

    fn session(user: &str) -> Session {
        Session::new(1, user)
    }

    #[test]
    fn sample_count_end_to_end() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "SAMPLE --count=3");
        assert_eq!(reply.texts(), vec!["Iteration 1", "Iteration 2", "Iteration 3"]);
        assert!(s.context.is_disabled());
        assert_eq!(reply.prompt, None);
        assert!(!reply.prompt_active);
    }

    #[test]
    fn madlib_end_to_end() {
        let d = dispatcher();
        let mut s = session("alice");

        let reply = d.handle(&mut s, "SAMPLE --madlib");
        assert_eq!(reply.texts(), vec!["Enter a noun."]);
        assert_eq!(reply.prompt.as_deref(), Some("MADLIB - Supply a noun"));
        assert!(reply.prompt_active);

        let reply = d.handle(&mut s, "cat");
        assert_eq!(reply.texts(), vec!["Enter a past-tense verb."]);
        let reply = d.handle(&mut s, "jumped");
        assert_eq!(reply.texts(), vec!["Enter an adjective."]);
        assert_eq!(s.context.prompt_data(), &["cat".to_string(), "jumped".to_string()][..]);

        let reply = d.handle(&mut s, "lazy");
        assert_eq!(reply.texts(), vec!["Madlib result: The lazy cat jumped over the lazy dog."]);
        assert!(s.context.is_disabled(), "no prior context, so restore deactivates");
        assert!(!reply.prompt_active);
        assert_eq!(reply.prompt, None);
    }

    #[test]
    fn prompt_lines_are_not_parsed_as_commands() {
        let d = dispatcher();
        let mut s = session("alice");
        d.handle(&mut s, "SAMPLE --madlib");
        // Looks like a command, but the prompt owns the line.
        let reply = d.handle(&mut s, "HELP");
        assert_eq!(reply.texts(), vec!["Enter a past-tense verb."]);
        assert_eq!(s.context.prompt_data(), &["HELP".to_string()][..]);
    }

    #[test]
    fn madlib_restores_passive_context() {
        let d = dispatcher();
        let mut s = session("alice");
        d.handle(&mut s, "HELP");
        assert_eq!(s.context.status(), ContextStatus::Passive);
        let before = s.context.frame().clone();

        d.handle(&mut s, "SAMPLE --madlib");
        assert_eq!(s.context.depth(), 1);
        for word in ["noun1", "verb1", "adj1"] {
            d.handle(&mut s, word);
        }
        assert_eq!(s.context.frame(), &before);
        assert_eq!(s.context.depth(), 0);
    }

    #[test]
    fn unknown_command_leaves_context() {
        let d = dispatcher();
        let mut s = session("alice");
        let before = s.context.clone();
        let reply = d.handle(&mut s, "frobnicate now");
        assert_eq!(reply.texts(), vec!["'FROBNICATE' is not a recognized command."]);
        assert_eq!(s.context, before);
    }

    #[test]
    fn unauthorized_leaves_context() {
        let d = dispatcher();
        let mut s = session("alice");
        d.handle(&mut s, "SAMPLE --madlib");
        d.handle(&mut s, "CANCEL");
        let before = s.context.clone();
        let reply = d.handle(&mut s, "VARIABLE Registration");
        assert_eq!(reply.texts(), vec!["You are not authorized to use that command."]);
        assert_eq!(s.context, before);
    }

    #[test]
    fn argument_error_during_prompt_keeps_prompt_state() {
        // Prompts once, then rejects every answer as a bad argument.
        fn picky(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
            if inv.context.prompt_data().is_empty() {
                inv.prompt("number?");
                return Ok(());
            }
            inv.context.set_prompt("PICKY", &[], "changed");
            Err(DispatchError::parse("That is not a number."))
        }
        let registry = CommandRegistry::from_descriptors(vec![CommandDescriptor {
            name: "PICKY",
            roles: RoleTemplates::EVERYONE,
            parameters: "",
            description: "",
            show_help: true,
            options: OptionSet::new,
            handler: picky,
        }])
        .unwrap();
        let d = Dispatcher::new(
            Arc::new(registry),
            Arc::new(MemoryUserStore::from_settings(&settings())),
            Arc::new(MemoryVariableStore::new()),
            10,
        );
        let mut s = session("alice");
        d.handle(&mut s, "PICKY");
        let before = s.context.clone();

        let reply = d.handle(&mut s, "seven");
        assert_eq!(reply.texts(), vec!["That is not a number."]);
        assert_eq!(s.context, before);
        assert!(s.context.prompt_data().is_empty());
        assert_eq!(reply.prompt.as_deref(), Some("number?"));
    }

    #[test]
    fn administrator_only_command_denied_to_user_role() {
        // A bespoke registry so the check does not depend on built-in commands.
        fn admin_only(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
            inv.context.set_prompt("PURGE", &[], "really?");
            Ok(())
        }
        let registry = CommandRegistry::from_descriptors(vec![CommandDescriptor {
            name: "PURGE",
            roles: RoleTemplates::ADMINISTRATORS,
            parameters: "",
            description: "",
            show_help: true,
            options: OptionSet::new,
            handler: admin_only,
        }])
        .unwrap();
        let d = Dispatcher::new(
            Arc::new(registry),
            Arc::new(MemoryUserStore::from_settings(&settings())),
            Arc::new(MemoryVariableStore::new()),
            10,
        );
        let mut s = session("alice");
        let reply = d.handle(&mut s, "purge");
        assert_eq!(reply.texts(), vec!["You are not authorized to use that command."]);
        assert_eq!(s.context, SessionContext::new());

        let mut admin = session("sysop");
        d.handle(&mut admin, "purge");
        assert!(admin.context.prompt_active());
    }

    #[test]
    fn argument_parse_error_leaves_context() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "SAMPLE --count");
        assert_eq!(reply.texts(), vec!["Missing required value for option '--count'."]);
        assert!(s.context.is_disabled());

        let reply = d.handle(&mut s, "SAMPLE \"--count=3");
        assert_eq!(reply.texts(), vec!["Unterminated quote in input."]);
    }

    #[test]
    fn alias_expands_with_trailing_args() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "c3");
        assert_eq!(reply.texts().len(), 3);
    }

    #[test]
    fn self_alias_expands_once() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "x");
        assert_eq!(reply.texts(), vec!["'X' is not a recognized command."]);
    }

    #[test]
    fn alias_to_alias_is_not_reexpanded() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "loop");
        assert_eq!(reply.texts(), vec!["'C3' is not a recognized command."]);
    }

    #[test]
    fn aliases_do_not_apply_inside_prompts() {
        let d = dispatcher();
        let mut s = session("alice");
        d.handle(&mut s, "SAMPLE --madlib");
        d.handle(&mut s, "c3");
        assert_eq!(s.context.prompt_data(), &["c3".to_string()][..]);
    }

    #[test]
    fn cancel_unwinds_prompt() {
        let d = dispatcher();
        let mut s = session("alice");
        d.handle(&mut s, "SAMPLE --madlib");
        d.handle(&mut s, "cat");
        let reply = d.handle(&mut s, "cancel");
        assert_eq!(reply.texts(), vec!["Action cancelled."]);
        assert!(s.context.is_disabled());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "sample --COUNT=1");
        assert_eq!(reply.texts(), vec!["Iteration 1"]);
    }

    #[test]
    fn blank_line_is_a_no_op() {
        let d = dispatcher();
        let mut s = session("alice");
        let reply = d.handle(&mut s, "   ");
        assert!(reply.output.is_empty());
        assert!(s.context.is_disabled());
    }

    #[test]
    fn passive_fallback_feeds_contexted_command() {
        let d = dispatcher();
        let mut s = session("alice");
        d.handle(&mut s, "HELP");
        assert_eq!(s.context.command(), Some("HELP"));
        assert_eq!(s.context.current_page(), 1);

        let reply = d.handle(&mut s, "2");
        assert!(reply.texts()[0].contains("page 2"), "got {:?}", reply.texts());
        assert_eq!(s.context.current_page(), 2);

        // A real command still wins over the fallback.
        let reply = d.handle(&mut s, "SAMPLE --count=1");
        assert_eq!(reply.texts(), vec!["Iteration 1"]);
    }

    #[test]
    fn handler_runtime_error_becomes_one_line() {
        fn broken(_: &mut Invocation<'_>) -> Result<(), DispatchError> {
            Err(DispatchError::runtime("disk on fire"))
        }
        let registry = CommandRegistry::from_descriptors(vec![CommandDescriptor {
            name: "BROKEN",
            roles: RoleTemplates::EVERYONE,
            parameters: "",
            description: "",
            show_help: false,
            options: OptionSet::new,
            handler: broken,
        }])
        .unwrap();
        let d = Dispatcher::new(
            Arc::new(registry),
            Arc::new(MemoryUserStore::from_settings(&settings())),
            Arc::new(MemoryVariableStore::new()),
            10,
        );
        let mut s = session("alice");
        let reply = d.handle(&mut s, "BROKEN");
        assert_eq!(reply.texts(), vec!["An error occurred: disk on fire"]);
    }
}
