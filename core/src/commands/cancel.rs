use crate::context::ContextStatus;
use crate::dispatch::Invocation;
use crate::error::DispatchError;
use crate::options::OptionSet;
use crate::registry::{CommandDescriptor, RoleTemplates};

use super::CANCEL;


pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: CANCEL,
        roles: RoleTemplates::EVERYONE,
        parameters: "",
        description: "Cancels the current prompt, or clears the current context.",
        show_help: true,
        options: OptionSet::new,
        handler: run,
    }
}


fn run(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    if inv.context.status() == ContextStatus::Forced {
        inv.context.restore();
        inv.write_line("Action cancelled.");
    } else {
        inv.context.deactivate();
        inv.write_line("Context cleared.");
    }
    Ok(())
}
