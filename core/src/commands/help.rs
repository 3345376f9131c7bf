use crate::context::ContextStatus;
use crate::dispatch::Invocation;
use crate::error::DispatchError;
use crate::help::{listing_page, write_help, write_listing};
use crate::options::OptionSet;
use crate::registry::{CommandDescriptor, RoleTemplates};


pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "HELP",
        roles: RoleTemplates::EVERYONE,
        parameters: "[command] [page]",
        description: "Lists available commands, or shows details for one command.",
        show_help: true,
        options: OptionSet::new,
        handler: run,
    }
}


/// `HELP`, `HELP 2`, `HELP SAMPLE`.
///
/// A positional that parses as a number selects a page; anything else names
/// a command. Inside a passive HELP context a bare number arrives here via
/// the dispatcher's fallback.
fn run(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    let mut page: Option<u32> = None;
    let mut topic: Option<&str> = None;
    for arg in inv.args {
        match arg.parse::<u32>() {
            Ok(n) => page = Some(n),
            Err(_) if topic.is_none() => topic = Some(arg.as_str()),
            Err(_) => {}
        }
    }

    if let Some(name) = topic {
        let descriptor = inv
            .registry
            .get(name)
            .filter(|d| d.show_help && d.roles.permits(inv.roles))
            .ok_or_else(|| DispatchError::UnknownCommand(name.to_ascii_uppercase()))?;
        write_help(inv.output, descriptor);
        return Ok(());
    }

    let commands = inv.registry.visible(inv.roles);
    let shown = listing_page(&commands, page.unwrap_or(1), inv.help_page_size);
    write_listing(inv.output, &shown);

    if shown.pages > 1 {
        inv.context.set(ContextStatus::Passive, inv.command.name, &[], None);
        inv.context.set_current_page(shown.page);
    }
    Ok(())
}
