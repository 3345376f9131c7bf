//! Built-in commands.
//!
//! Each submodule exposes one `descriptor()`; `builtin()` gathers them for
//! `CommandRegistry::standard`.

pub mod alias;
pub mod cancel;
pub mod help;
pub mod initialize;
pub mod sample;
pub mod variable;

use crate::registry::CommandDescriptor;


/// Name of the prompt escape command. The dispatcher special-cases it while
/// a prompt is active.
pub const CANCEL: &str = "CANCEL";

/// Shown when a command's arguments match none of its options.
pub const INVALID_ARGUMENTS: &str = "Invalid arguments supplied.";


pub fn builtin() -> Vec<CommandDescriptor> {
    vec![
        help::descriptor(),
        sample::descriptor(),
        alias::descriptor(),
        variable::descriptor(),
        initialize::descriptor(),
        cancel::descriptor(),
    ]
}
