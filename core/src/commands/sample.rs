//! SAMPLE: A template command exercising every option kind, both prompt
//! styles and the variable store.

use crate::dispatch::Invocation;
use crate::error::DispatchError;
use crate::help::write_help;
use crate::options::{OptionSet, Toggle};
use crate::registry::{CommandDescriptor, RoleTemplates};

use super::INVALID_ARGUMENTS;


/// Variable written by `--writeMessage` and read by `--readMessage`.
pub const MESSAGE_VARIABLE: &str = "sampleMessage";

/// Largest `--count` accepted; one line of output per iteration.
pub const MAX_COUNT: i64 = 1000;


pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "SAMPLE",
        roles: RoleTemplates::EVERYONE,
        parameters: "[Option(s)]",
        description: "A sample command that can be used as a template to create new commands.",
        show_help: true,
        options,
        handler: run,
    }
}


fn options() -> OptionSet {
    OptionSet::new()
        .flag("?|help", "Show help information.")
        .required("c|count", "Count to a specified number.")
        .optional("echo", "Echo a default message or a specified value.")
        .flag("madlib", "Asks for a few words and inserts them into a short story.")
        .flag("readMessage", "Retrieves the stored message.")
        .flag("writeMessage", "Stores a message for later retrieval.")
        .toggle("option1", "Toggles option1 on. Supply a minus (-) after the option to toggle it off.")
        .toggle("option2", "Toggles option2 on. Supply a minus (-) after the option to toggle it off.")
}


fn run(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    let options = options();
    let parsed = inv.parse(&options)?;

    if !parsed.matched_any() {
        inv.write_line(INVALID_ARGUMENTS);
        return Ok(());
    }

    // Exclusive options first, in priority order.
    if parsed.has("help") {
        write_help(inv.output, inv.command);
    } else if let Some(count) = parsed.int_value("count")?.filter(|n| *n > 0) {
        if count > MAX_COUNT {
            return Err(DispatchError::parse(format!(
                "The count may not be more than {}.",
                MAX_COUNT
            )));
        }
        for i in 1..=count {
            inv.write_line(format!("Iteration {}", i));
        }
    } else if parsed.has("echo") {
        let message = parsed.value("echo").unwrap_or("Hello_World!");
        inv.write_line(format!("Echo: {}", message));
    } else if parsed.has("madlib") {
        madlib(inv);
    } else if parsed.has("writeMessage") {
        write_message(inv)?;
    } else if parsed.has("readMessage") {
        let message = inv
            .variables
            .get(MESSAGE_VARIABLE)?
            .unwrap_or_else(|| "You have not stored a message yet.".to_string());
        inv.write_line(format!("Result: {}", message));
    } else {
        for name in ["option1", "option2"] {
            let state = match parsed.toggle(name) {
                Toggle::On => "enabled",
                Toggle::Off => "disabled",
                Toggle::Unset => continue,
            };
            inv.write_line(format!("Option{} has been {}.", &name[6..], state));
        }
    }
    Ok(())
}


/// Three prompts, then the story. The number of answers so far says which
/// step this is.
fn madlib(inv: &mut Invocation<'_>) {
    let answers = inv.context.prompt_data().to_vec();
    match answers.as_slice() {
        [] => {
            inv.write_line("Enter a noun.");
            inv.prompt("MADLIB - Supply a noun");
        }
        [_] => {
            inv.write_line("Enter a past-tense verb.");
            inv.prompt("MADLIB - Supply a past-tense verb");
        }
        [_, _] => {
            inv.write_line("Enter an adjective.");
            inv.prompt("MADLIB - Supply an adjective");
        }
        [noun, verb, adjective, ..] => {
            inv.write_line(format!(
                "Madlib result: The {} {} {} over the lazy dog.",
                adjective, noun, verb
            ));
            inv.context.restore();
        }
    }
}


fn write_message(inv: &mut Invocation<'_>) -> Result<(), DispatchError> {
    match inv.context.prompt_data().first().cloned() {
        None => {
            inv.write_line("Enter a message to store in the database.");
            inv.prompt("Write Message");
        }
        Some(message) => {
            inv.variables.set(MESSAGE_VARIABLE, &message)?;
            inv.write_line("Message saved successfully.");
            inv.context.restore();
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{dispatcher, run};
    use crate::context::ContextStatus;
    use crate::session::Session;

    fn alice() -> Session {
        Session::new(1, "alice")
    }

    #[test]
    fn no_args_or_no_match_is_invalid() {
        let d = dispatcher();
        let mut s = alice();
        assert_eq!(run(&d, &mut s, &["SAMPLE"]).texts(), vec![INVALID_ARGUMENTS]);
        assert_eq!(run(&d, &mut s, &["SAMPLE banana"]).texts(), vec![INVALID_ARGUMENTS]);
    }

    #[test]
    fn count_forms() {
        let d = dispatcher();
        let mut s = alice();
        assert_eq!(run(&d, &mut s, &["SAMPLE -c 2"]).texts(), vec!["Iteration 1", "Iteration 2"]);
        assert_eq!(run(&d, &mut s, &["SAMPLE /count:1"]).texts(), vec!["Iteration 1"]);
        assert_eq!(
            run(&d, &mut s, &["SAMPLE --count=abc"]).texts(),
            vec!["'abc' is not a valid number for option 'count'."]
        );
        // Zero falls through to the toggles, which are unset.
        assert!(run(&d, &mut s, &["SAMPLE --count=0"]).output.is_empty());
    }

    #[test]
    fn count_is_capped() {
        let d = dispatcher();
        let mut s = alice();
        let reply = run(&d, &mut s, &["SAMPLE --count=3000000"]);
        assert_eq!(reply.texts(), vec!["The count may not be more than 1000."]);

        let reply = run(&d, &mut s, &[&format!("SAMPLE --count={}", MAX_COUNT)]);
        assert_eq!(reply.output.len(), MAX_COUNT as usize);
    }

    #[test]
    fn echo_default_and_value() {
        let d = dispatcher();
        let mut s = alice();
        assert_eq!(run(&d, &mut s, &["SAMPLE --echo"]).texts(), vec!["Echo: Hello_World!"]);
        assert_eq!(run(&d, &mut s, &["SAMPLE --echo=hey"]).texts(), vec!["Echo: hey"]);
    }

    #[test]
    fn exclusive_options_take_priority() {
        let d = dispatcher();
        let mut s = alice();
        let reply = run(&d, &mut s, &["SAMPLE --echo --count=1 --option1"]);
        assert_eq!(reply.texts(), vec!["Iteration 1"]);
        let reply = run(&d, &mut s, &["SAMPLE --madlib --help"]);
        assert_eq!(reply.texts()[0], "SAMPLE [Option(s)]");
        assert!(s.context.is_disabled());
    }

    #[test]
    fn toggles_combine() {
        let d = dispatcher();
        let mut s = alice();
        let reply = run(&d, &mut s, &["SAMPLE --option1 --option2-"]);
        assert_eq!(
            reply.texts(),
            vec!["Option1 has been enabled.", "Option2 has been disabled."]
        );
    }

    #[test]
    fn write_then_read_message() {
        let d = dispatcher();
        let mut s = alice();
        assert_eq!(
            run(&d, &mut s, &["SAMPLE --readMessage"]).texts(),
            vec!["Result: You have not stored a message yet."]
        );

        let reply = run(&d, &mut s, &["SAMPLE --writeMessage"]);
        assert_eq!(reply.texts(), vec!["Enter a message to store in the database."]);
        assert_eq!(reply.prompt.as_deref(), Some("Write Message"));
        assert_eq!(s.context.status(), ContextStatus::Forced);

        let reply = run(&d, &mut s, &["hello there, world"]);
        assert_eq!(reply.texts(), vec!["Message saved successfully."]);
        assert!(s.context.is_disabled());
        assert_eq!(
            d.variables().get(MESSAGE_VARIABLE).unwrap().as_deref(),
            Some("hello there, world")
        );

        // Another session sees the same store.
        let mut other = Session::new(2, "sysop");
        assert_eq!(
            run(&d, &mut other, &["SAMPLE --readMessage"]).texts(),
            vec!["Result: hello there, world"]
        );
    }

    #[test]
    fn empty_prompt_answer_is_recorded() {
        let d = dispatcher();
        let mut s = alice();
        let reply = run(&d, &mut s, &["SAMPLE --madlib", ""]);
        assert_eq!(reply.texts(), vec!["Enter a past-tense verb."]);
        assert_eq!(s.context.prompt_data(), &[String::new()][..]);
    }
}
