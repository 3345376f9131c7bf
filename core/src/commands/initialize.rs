use crate::dispatch::Invocation;
use crate::error::DispatchError;
use crate::options::OptionSet;
use crate::registry::{CommandDescriptor, RoleTemplates};


/// Sent by clients right after login to reset the screen.
pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "INITIALIZE",
        roles: RoleTemplates::EVERYONE,
        parameters: "",
        description: "Resets the terminal and shows the welcome line.",
        show_help: false,
        options: OptionSet::new,
        handler: run,
    }
}


fn run(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    inv.context.deactivate();
    if inv.users.is_known(inv.user) {
        let line = format!("You are currently logged in as {}.", inv.user);
        inv.write_line(line);
    } else {
        inv.write_line("Type HELP to begin.");
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use crate::commands::testing::{dispatcher, run};
    use crate::session::Session;

    #[test]
    fn greets_known_user_and_guest() {
        let d = dispatcher();
        let mut s = Session::new(1, "alice");
        assert_eq!(
            run(&d, &mut s, &["INITIALIZE"]).texts(),
            vec!["You are currently logged in as alice."]
        );

        let mut guest = Session::new(2, "guest");
        assert_eq!(run(&d, &mut guest, &["initialize"]).texts(), vec!["Type HELP to begin."]);
    }

    #[test]
    fn initialize_wipes_context() {
        let d = dispatcher();
        let mut s = Session::new(1, "alice");
        run(&d, &mut s, &["HELP"]);
        // Inside a prompt the line is an answer, so cancel first.
        run(&d, &mut s, &["SAMPLE --madlib", "CANCEL", "INITIALIZE"]);
        assert!(s.context.is_disabled());
        assert_eq!(s.context.depth(), 0);
    }
}
