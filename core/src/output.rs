//! Command output: Ordered display directives handed to the transport.
//!
//! The core never renders anything itself. Each directive carries the text
//! and a few rendering hints; what "no animation" or "inverted" looks like is
//! up to whichever client draws it.

use serde::{Deserialize, Serialize};


/// Rendering hints for one line of output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayMode {
    /// Print the line at once instead of with the typewriter effect.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_animation: bool,
    /// Do not word-wrap the line (ASCII art, tables).
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_wrap: bool,
    /// Highlighted / reverse-video line.
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverted: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl DisplayMode {
    pub const PLAIN: DisplayMode = DisplayMode {
        no_animation: false,
        no_wrap: false,
        inverted: false,
    };

    pub const PREFORMATTED: DisplayMode = DisplayMode {
        no_animation: true,
        no_wrap: true,
        inverted: false,
    };

    pub const INVERTED: DisplayMode = DisplayMode {
        no_animation: false,
        no_wrap: false,
        inverted: true,
    };
}


/// One line of output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayDirective {
    pub text: String,
    #[serde(default)]
    pub mode: DisplayMode,
}


/// Accumulates the output of one request, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    lines: Vec<DisplayDirective>,
}

impl CommandResult {
    pub fn new() -> Self {
        CommandResult::default()
    }

    pub fn write_line(&mut self, text: impl Into<String>) {
        self.write_line_with(DisplayMode::PLAIN, text);
    }

    pub fn write_line_with(&mut self, mode: DisplayMode, text: impl Into<String>) {
        self.lines.push(DisplayDirective {
            text: text.into(),
            mode,
        });
    }

    pub fn blank_line(&mut self) {
        self.write_line("");
    }

    pub fn lines(&self) -> &[DisplayDirective] {
        &self.lines
    }

    /// Plain text of every line, for tests and logging.
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|d| d.text.as_str()).collect()
    }

    pub fn into_lines(self) -> Vec<DisplayDirective> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
