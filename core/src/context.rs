//! Session context: What command or prompt a session is currently inside.
//!
//! A context is a frame of state (contexted command, its args, prompt label,
//! accumulated prompt answers, pagination/filter state) plus a stack of
//! backed-up frames. The stack only grows on a Passive → Forced transition,
//! and every `restore()` pops exactly one frame, so a forced prompt always
//! has one well-defined way back out.
//!
//! # Status
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `Disabled` | No context. Every field is cleared. |
//! | `Passive` | Context exists, but normal command parsing is tried first. |
//! | `Forced` | The next input line belongs to the contexted command. |

use serde::{Deserialize, Serialize};


/// Governs how the dispatcher treats the next input line.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    #[default]
    Disabled,
    Passive,
    Forced,
}


/// One level of context state. The live context and every backup are frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextFrame {
    pub status: ContextStatus,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub display_text: Option<String>,
    pub prompt_active: bool,
    /// Answers collected while prompting, one entry per round, in order.
    pub prompt_data: Vec<String>,
    pub current_page: u32,
    pub link_tags: Vec<String>,
    pub search_terms: Vec<String>,
    pub sort_order: Option<String>,
}

impl ContextFrame {
    fn is_cleared(&self) -> bool {
        *self == ContextFrame::default()
    }
}


/// The live context of one session plus its backup stack.
///
/// Owned exclusively by the session; nothing here is shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    frame: ContextFrame,
    backups: Vec<ContextFrame>,
}

impl SessionContext {
    /// A fresh, Disabled context.
    pub fn new() -> Self {
        SessionContext::default()
    }

    /// Set the current context.
    ///
    /// A Passive → Forced transition first pushes the passive frame onto the
    /// backup stack, and the forced frame starts with no prompt answers.
    /// Any other transition overwrites in place. Setting `Disabled` is a
    /// full `deactivate()`.
    pub fn set(
        &mut self,
        status: ContextStatus,
        command: &str,
        args: &[String],
        text: Option<&str>,
    ) {
        if status == ContextStatus::Disabled {
            self.deactivate();
            return;
        }
        if self.frame.status == ContextStatus::Passive && status == ContextStatus::Forced {
            self.backup();
        }
        if status != ContextStatus::Forced {
            self.frame.prompt_active = false;
        }
        self.frame.status = status;
        self.frame.command = Some(command.to_string());
        self.frame.args = args.to_vec();
        self.frame.display_text = text.map(str::to_string);
    }

    /// Enter prompt mode: the same command and args are re-invoked for every
    /// following input line, and each line is appended to `prompt_data`.
    pub fn set_prompt(&mut self, command: &str, args: &[String], text: &str) {
        self.set(ContextStatus::Forced, command, args, Some(text));
        self.frame.prompt_active = true;
    }

    /// Pop one backup frame into the live context, or deactivate when there
    /// is nothing to pop.
    pub fn restore(&mut self) {
        match self.backups.pop() {
            Some(previous) => self.frame = previous,
            None => self.deactivate(),
        }
    }

    /// Hard reset to Disabled. The backup stack is discarded, not restored.
    pub fn deactivate(&mut self) {
        self.frame = ContextFrame::default();
        self.backups.clear();
    }

    fn backup(&mut self) {
        self.backups.push(self.frame.clone());
        self.frame.prompt_active = false;
        self.frame.prompt_data.clear();
    }

    /// Append one prompt answer. Only the dispatcher calls this.
    pub(crate) fn push_prompt_entry(&mut self, line: &str) {
        self.frame.prompt_data.push(line.to_string());
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn status(&self) -> ContextStatus {
        self.frame.status
    }

    pub fn command(&self) -> Option<&str> {
        self.frame.command.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.frame.args
    }

    pub fn display_text(&self) -> Option<&str> {
        self.frame.display_text.as_deref()
    }

    pub fn prompt_active(&self) -> bool {
        self.frame.prompt_active
    }

    pub fn prompt_data(&self) -> &[String] {
        &self.frame.prompt_data
    }

    pub fn frame(&self) -> &ContextFrame {
        &self.frame
    }

    /// Number of backed-up frames below the live one.
    pub fn depth(&self) -> usize {
        self.backups.len()
    }

    pub fn is_disabled(&self) -> bool {
        self.frame.status == ContextStatus::Disabled
    }

    // -----------------------------------------------------------------
    // Pagination / filter state
    // -----------------------------------------------------------------

    pub fn current_page(&self) -> u32 {
        self.frame.current_page
    }

    pub fn set_current_page(&mut self, page: u32) {
        self.frame.current_page = page;
    }

    pub fn link_tags(&self) -> &[String] {
        &self.frame.link_tags
    }

    pub fn set_link_tags(&mut self, tags: Vec<String>) {
        self.frame.link_tags = tags;
    }

    pub fn search_terms(&self) -> &[String] {
        &self.frame.search_terms
    }

    pub fn set_search_terms(&mut self, terms: Vec<String>) {
        self.frame.search_terms = terms;
    }

    pub fn sort_order(&self) -> Option<&str> {
        self.frame.sort_order.as_deref()
    }

    pub fn set_sort_order(&mut self, order: Option<String>) {
        self.frame.sort_order = order;
    }

    /// Checks the structural invariants. Used by tests and debug assertions.
    pub fn invariants_hold(&self) -> bool {
        let live_ok = match self.frame.status {
            ContextStatus::Disabled => self.frame.is_cleared() && self.backups.is_empty(),
            ContextStatus::Passive => !self.frame.prompt_active,
            ContextStatus::Forced => true,
        };
        // Only passive frames are ever backed up.
        live_ok
            && self
                .backups
                .iter()
                .all(|f| f.status == ContextStatus::Passive && !f.prompt_active)
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
