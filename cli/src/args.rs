//! Command-line argument parsing for the `terminal` binary.


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Run the daemon in this process.
    Serve,
    /// Interactive session as `user`.
    Connect { user: String },
    /// Run one line as `user` and print the reply.
    Send { user: String, line: String },
    /// Ask a running daemon to stop.
    Stop,
    Help,
}


pub const USAGE: &str = "\
usage: terminal <command>

commands:
  serve                    run the terminal daemon in the foreground
  connect <user>           open an interactive session
  send <user> <line...>    run one input line and print the output
  stop                     stop the running daemon";


pub fn parse_args(args: &[&str]) -> Result<CliCommand, String> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(CliCommand::Help);
    };
    match *first {
        "serve" => no_more(rest, CliCommand::Serve),
        "stop" => no_more(rest, CliCommand::Stop),
        "help" | "-h" | "--help" => Ok(CliCommand::Help),
        "connect" => match rest {
            [user] => Ok(CliCommand::Connect { user: user.to_string() }),
            [] => Err("connect: missing <user>".into()),
            _ => Err("connect: expected exactly one <user>".into()),
        },
        "send" => match rest {
            [user, line @ ..] if !line.is_empty() => Ok(CliCommand::Send {
                user: user.to_string(),
                line: join_quoted(line),
            }),
            _ => Err("send: expected <user> <line...>".into()),
        },
        other => Err(format!("unknown command '{}'", other)),
    }
}


/// Rebuild one input line from argv. Arguments the shell kept together
/// are quoted again so the daemon's tokenizer sees the same words.
fn join_quoted(args: &[&str]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                format!("\"{}\"", arg)
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}


fn no_more(rest: &[&str], cmd: CliCommand) -> Result<CliCommand, String> {
    match rest.first() {
        None => Ok(cmd),
        Some(extra) => Err(format!("unexpected argument '{}'", extra)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_subcommands() {
        assert_eq!(parse_args(&[]).unwrap(), CliCommand::Help);
        assert_eq!(parse_args(&["serve"]).unwrap(), CliCommand::Serve);
        assert_eq!(parse_args(&["stop"]).unwrap(), CliCommand::Stop);
        assert_eq!(
            parse_args(&["connect", "alice"]).unwrap(),
            CliCommand::Connect { user: "alice".into() }
        );
        assert_eq!(
            parse_args(&["send", "alice", "SAMPLE", "--count=2"]).unwrap(),
            CliCommand::Send {
                user: "alice".into(),
                line: "SAMPLE --count=2".into()
            }
        );
    }

    #[test]
    fn send_keeps_shell_quoting() {
        assert_eq!(
            parse_args(&["send", "alice", "SAMPLE", "--echo=a b"]).unwrap(),
            CliCommand::Send {
                user: "alice".into(),
                line: "SAMPLE \"--echo=a b\"".into()
            }
        );
        assert_eq!(join_quoted(&["say", ""]), "say \"\"");
    }

    #[test]
    fn parse_errors() {
        assert!(parse_args(&["connect"]).is_err());
        assert!(parse_args(&["send", "alice"]).is_err());
        assert!(parse_args(&["serve", "now"]).unwrap_err().contains("now"));
        assert!(parse_args(&["dance"]).unwrap_err().contains("dance"));
    }
}
