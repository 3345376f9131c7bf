//! `terminal`: Command-line entry point for the terminal daemon.
//!
//! # Usage
//!
//! ```text
//! terminal serve
//! terminal connect alice
//! terminal send alice SAMPLE --count=3
//! terminal stop
//! ```

mod args;
mod render;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use terminal_core::client::{daemon_listening, ensure_daemon, TerminalClient};
use terminal_core::daemon::Daemon;
use terminal_core::dispatch::Reply;
use terminal_core::settings;
use terminal_core::types::config::Settings;
use terminal_core::TerminalError;

use args::{parse_args, CliCommand, USAGE};


/// How long `connect`/`send` wait for a freshly started daemon.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);


fn main() {
    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let cmd = match parse_args(&arg_refs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("terminal: {}", e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    let config_dir = resolve_config_dir();
    let settings = match settings::load_dir(&config_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("terminal: {}", e);
            process::exit(1);
        }
    };
    init_logging(&settings.log_level);
    debug!(config_dir = %config_dir.display(), "configuration loaded");

    let result = match cmd {
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Serve => serve(&config_dir, settings),
        CliCommand::Connect { user } => connect(&config_dir, &settings, &user),
        CliCommand::Send { user, line } => send(&config_dir, &settings, &user, &line),
        CliCommand::Stop => stop(&config_dir, &settings),
    };

    if let Err(e) = result {
        eprintln!("terminal: {}", e);
        process::exit(1);
    }
}


fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TERMINAL_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("terminal")
}


/// `TERMINAL_LOG` wins over the configured level. Logs go to stderr so
/// they never mix with session output.
fn init_logging(configured: &str) {
    let filter = EnvFilter::try_from_env("TERMINAL_LOG")
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}


fn serve(config_dir: &Path, settings: Settings) -> Result<(), TerminalError> {
    let mut daemon = Daemon::with_settings(config_dir, settings)?;
    daemon.run()
}


fn open_client(config_dir: &Path, settings: &Settings) -> Result<TerminalClient, TerminalError> {
    let socket = config_dir.join(&settings.socket_name);
    ensure_daemon(config_dir, &socket, STARTUP_TIMEOUT)?;
    TerminalClient::connect(
        &socket,
        Duration::from_millis(settings.request_timeout_ms),
        settings.max_frame_bytes,
    )
}


fn show(reply: &Reply) -> Result<(), TerminalError> {
    let mut out = io::stdout();
    render::render(&mut out, &reply.output, render::terminal_width())
        .map_err(|e| TerminalError::socket("writing output", e))
}


fn prompt_label(reply: &Reply) -> String {
    match &reply.prompt {
        Some(text) => format!("{}> ", text),
        None => "> ".to_string(),
    }
}


fn connect(config_dir: &Path, settings: &Settings, user: &str) -> Result<(), TerminalError> {
    let mut client = open_client(config_dir, settings)?;
    let mut reply = client.login(user)?;
    show(&reply)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", prompt_label(&reply));
        let _ = io::stdout().flush();

        let Some(line) = lines.next() else { break };
        let line = line.map_err(|e| TerminalError::socket("reading stdin", e))?;
        reply = match client.send(&line) {
            Ok(reply) => reply,
            Err(TerminalError::Remote(message)) => {
                eprintln!("terminal: {}", message);
                continue;
            }
            Err(e) => return Err(e),
        };
        show(&reply)?;
    }
    println!();
    client.logout()
}


fn send(config_dir: &Path, settings: &Settings, user: &str, line: &str) -> Result<(), TerminalError> {
    let mut client = open_client(config_dir, settings)?;
    client.login(user)?;
    let reply = client.send(line)?;
    show(&reply)?;
    client.logout()
}


fn stop(config_dir: &Path, settings: &Settings) -> Result<(), TerminalError> {
    let socket = config_dir.join(&settings.socket_name);
    if !daemon_listening(&socket) {
        println!("terminal: daemon not running");
        return Ok(());
    }
    TerminalClient::connect(&socket, Duration::from_millis(settings.request_timeout_ms), settings.max_frame_bytes)?
        .shutdown()?;
    println!("terminal: daemon stopped");
    Ok(())
}
