use crate::dispatch::Invocation;
use crate::error::DispatchError;
use crate::help::write_help;
use crate::options::OptionSet;
use crate::registry::{CommandDescriptor, RoleTemplates};

use super::INVALID_ARGUMENTS;


pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "VARIABLE",
        roles: RoleTemplates::ADMINISTRATORS,
        parameters: "<name> [--set]",
        description: "Shows or changes an application variable.",
        show_help: true,
        options,
        handler: run,
    }
}


fn options() -> OptionSet {
    OptionSet::new()
        .flag("?|help", "Show help information.")
        .flag("s|set", "Prompt for a new value for the variable.")
}


fn run(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    let options = options();
    let parsed = inv.parse(&options)?;

    if parsed.has("help") {
        write_help(inv.output, inv.command);
        return Ok(());
    }
    let [name] = parsed.positional() else {
        inv.write_line(INVALID_ARGUMENTS);
        return Ok(());
    };

    if !parsed.has("set") {
        match inv.variables.get(name)? {
            Some(value) => inv.write_line(format!("{} = {}", name, value)),
            None => inv.write_line(format!("Variable '{}' is not set.", name)),
        }
        return Ok(());
    }

    match inv.context.prompt_data().first().cloned() {
        None => {
            inv.write_line(format!("Enter a new value for '{}'.", name));
            inv.prompt(&format!("VARIABLE - {}", name));
        }
        Some(value) => {
            inv.variables.set(name, &value)?;
            inv.write_line(format!("Variable '{}' updated.", name));
            inv.context.restore();
        }
    }
    Ok(())
}
