//! Client: One connection to the terminal daemon.
//!
//! Frontends log in once and then send raw input lines; each call returns
//! the daemon's reply. `ensure_daemon` starts a background daemon when
//! none is listening, so `terminal connect` works without a separate
//! `terminal serve`.

use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::dispatch::Reply;
use crate::error::TerminalError;
use crate::service::{read_frame, write_frame};
use crate::types::protocol::{ClientFrame, Response};


pub struct TerminalClient {
    stream: UnixStream,
    max_frame_bytes: usize,
}

impl TerminalClient {
    /// Connect to the daemon socket. `timeout` bounds each reply.
    pub fn connect(socket: &Path, timeout: Duration, max_frame_bytes: usize) -> Result<TerminalClient, TerminalError> {
        let stream = UnixStream::connect(socket).map_err(|e| TerminalError::io("connecting", socket, e))?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| TerminalError::socket("setting read timeout", e))?;
        Ok(TerminalClient { stream, max_frame_bytes })
    }

    fn request(&mut self, frame: &ClientFrame) -> Result<Response, TerminalError> {
        write_frame(&mut self.stream, frame, self.max_frame_bytes)?;
        read_frame(&mut self.stream, self.max_frame_bytes)
    }

    /// Open a session. The reply is the session's welcome output.
    pub fn login(&mut self, user: &str) -> Result<Reply, TerminalError> {
        let response = self.request(&ClientFrame::Login { user: user.to_string() })?;
        into_reply(response)
    }

    /// Run one input line.
    pub fn send(&mut self, line: &str) -> Result<Reply, TerminalError> {
        let response = self.request(&ClientFrame::Input { line: line.to_string() })?;
        into_reply(response)
    }

    pub fn logout(mut self) -> Result<(), TerminalError> {
        self.request(&ClientFrame::Logout).and_then(into_reply).map(|_| ())
    }

    /// Ask the daemon to stop.
    pub fn shutdown(mut self) -> Result<(), TerminalError> {
        self.request(&ClientFrame::Shutdown).and_then(into_reply).map(|_| ())
    }
}


fn into_reply(response: Response) -> Result<Reply, TerminalError> {
    match response {
        Response::Ok { output, prompt, prompt_active } => Ok(Reply {
            output,
            prompt,
            prompt_active,
        }),
        Response::Error { message } => Err(TerminalError::Remote(message)),
    }
}


// ---------------------------------------------------------------------------
// Daemon lifecycle
// ---------------------------------------------------------------------------

/// True when something accepts connections at `socket`.
pub fn daemon_listening(socket: &Path) -> bool {
    socket.exists() && UnixStream::connect(socket).is_ok()
}


/// Make sure a daemon is listening, starting `<current_exe> serve` in the
/// background if needed.
pub fn ensure_daemon(config_dir: &Path, socket: &Path, timeout: Duration) -> Result<(), TerminalError> {
    if daemon_listening(socket) {
        return Ok(());
    }
    let pid = start_daemon_process(config_dir)?;
    debug!(pid, "started background daemon");
    wait_for_socket(socket, timeout)
}


/// Spawn `<current_exe> serve` with `TERMINAL_CONFIG_DIR` pointing at
/// `config_dir`. Output goes to `daemon.log` there.
fn start_daemon_process(config_dir: &Path) -> Result<u32, TerminalError> {
    let exe = std::env::current_exe().map_err(TerminalError::Spawn)?;

    std::fs::create_dir_all(config_dir).map_err(|e| TerminalError::io("creating config dir", config_dir, e))?;
    let log_path = config_dir.join("daemon.log");
    let log_file = std::fs::File::create(&log_path).map_err(|e| TerminalError::io("creating log", &log_path, e))?;
    let log_stderr = log_file
        .try_clone()
        .map_err(|e| TerminalError::io("cloning log handle", &log_path, e))?;

    let child = std::process::Command::new(&exe)
        .arg("serve")
        .env("TERMINAL_CONFIG_DIR", config_dir)
        .stdout(log_file)
        .stderr(log_stderr)
        .spawn()
        .map_err(TerminalError::Spawn)?;
    Ok(child.id())
}


/// Poll with backoff until the socket accepts a connection.
pub fn wait_for_socket(socket: &Path, timeout: Duration) -> Result<(), TerminalError> {
    let deadline = Instant::now() + timeout;
    let mut interval = Duration::from_millis(25);

    loop {
        if daemon_listening(socket) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(TerminalError::Protocol(format!(
                "timed out waiting for daemon socket at {}",
                socket.display()
            )));
        }
        std::thread::sleep(interval);
        interval = std::cmp::min(interval * 2, Duration::from_millis(200));
    }
}
