use crate::dispatch::Invocation;
use crate::error::DispatchError;
use crate::help::write_help;
use crate::options::OptionSet;
use crate::output::DisplayMode;
use crate::registry::{CommandDescriptor, RoleTemplates};

use super::INVALID_ARGUMENTS;


pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "ALIAS",
        roles: RoleTemplates::ALL_LOGGED_IN,
        parameters: "[Option(s)]",
        description: "Lists, creates and deletes your command shortcuts.",
        show_help: true,
        options,
        handler: run,
    }
}


fn options() -> OptionSet {
    OptionSet::new()
        .flag("?|help", "Show help information.")
        .flag("l|list", "List your aliases.")
        .required("n|new", "Create or replace an alias. You will be prompted for the command line.")
        .required("d|delete", "Delete an alias.")
}


fn run(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    if inv.args.is_empty() {
        list(inv);
        return Ok(());
    }

    let options = options();
    let parsed = inv.parse(&options)?;
    if !parsed.matched_any() {
        inv.write_line(INVALID_ARGUMENTS);
    } else if parsed.has("help") {
        write_help(inv.output, inv.command);
    } else if let Some(shortcut) = parsed.value("new") {
        let shortcut = checked_shortcut(shortcut)?;
        create(inv, &shortcut)?;
    } else if let Some(shortcut) = parsed.value("delete") {
        let shortcut = checked_shortcut(shortcut)?;
        if inv.users.remove_alias(inv.user, &shortcut)? {
            inv.write_line(format!("Alias '{}' deleted.", shortcut));
        } else {
            inv.write_line(format!("You have no alias named '{}'.", shortcut));
        }
    } else {
        list(inv);
    }
    Ok(())
}


fn checked_shortcut(raw: &str) -> Result<String, DispatchError> {
    let shortcut = raw.trim();
    if shortcut.is_empty() || shortcut.contains(char::is_whitespace) {
        return Err(DispatchError::parse("An alias shortcut must be a single word."));
    }
    Ok(shortcut.to_string())
}


fn list(inv: &mut Invocation<'_>) {
    let table = inv.users.aliases(inv.user);
    if table.is_empty() {
        inv.write_line("You have no aliases.");
        return;
    }
    let width = table.iter().map(|a| a.shortcut.len()).max().unwrap_or(0);
    inv.write_line("Your aliases:");
    for alias in table.iter() {
        let row = format!("  {:<width$}  {}", alias.shortcut, alias.expansion, width = width);
        inv.output.write_line_with(DisplayMode::PREFORMATTED, row);
    }
}


/// Two steps: ask for the expansion, then store it. The expansion is taken
/// as a raw prompt line so it may contain spaces and options.
fn create(inv: &mut Invocation<'_>, shortcut: &str) -> Result<(), DispatchError> {
    let Some(expansion) = inv.context.prompt_data().first().cloned() else {
        inv.write_line(format!("Enter the command line for alias '{}'.", shortcut));
        inv.prompt(&format!("ALIAS - {}", shortcut));
        return Ok(());
    };

    let expansion = expansion.trim();
    if expansion.is_empty() {
        inv.write_line("Alias not saved: the command line was empty.");
    } else {
        match inv.users.set_alias(inv.user, shortcut, expansion)? {
            Some(_) => inv.write_line(format!("Alias '{}' updated.", shortcut)),
            None => inv.write_line(format!("Alias '{}' saved.", shortcut)),
        }
    }
    inv.context.restore();
    Ok(())
}
