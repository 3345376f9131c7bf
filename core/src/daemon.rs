//! Daemon: The terminal server's main loop.
//!
//! Session work happens on session and connection threads. The main loop
//! only accepts connections and watches for a shutdown request, which can
//! arrive over the channel (`DaemonHandle::shutdown`) or from a client's
//! `shutdown` frame.
//!
//! # Main loop tick
//!
//! 1. Check the channel
//! 2. Accept socket connections (non-blocking with timeout)
//! 3. Check whether a client asked to stop

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::dispatch::Dispatcher;
use crate::error::TerminalError;
use crate::service::ServiceSocket;
use crate::session::SessionManager;
use crate::settings;
use crate::types::config::Settings;


/// Events that can be sent to the daemon's main loop.
#[derive(Debug)]
pub enum DaemonEvent {
    Shutdown,
}


/// Lets other threads talk to a running daemon.
#[derive(Clone)]
pub struct DaemonHandle {
    sender: mpsc::Sender<DaemonEvent>,
}

impl DaemonHandle {
    /// Request daemon shutdown.
    pub fn shutdown(&self) -> Result<(), TerminalError> {
        self.sender
            .send(DaemonEvent::Shutdown)
            .map_err(|_| TerminalError::Protocol("daemon is no longer running".into()))
    }
}


pub struct Daemon {
    settings: Settings,
    service: ServiceSocket,
    manager: Arc<SessionManager>,
    receiver: mpsc::Receiver<DaemonEvent>,
    handle: DaemonHandle,
    pid_path: PathBuf,
}

impl Daemon {
    /// Load `terminal.yaml` from `config_dir` and start.
    pub fn new(config_dir: &Path) -> Result<Daemon, TerminalError> {
        let settings = settings::load_dir(config_dir)?;
        Self::with_settings(config_dir, settings)
    }

    /// Claim the pid file, build the dispatcher and bind the socket.
    pub fn with_settings(config_dir: &Path, settings: Settings) -> Result<Daemon, TerminalError> {
        std::fs::create_dir_all(config_dir)
            .map_err(|e| TerminalError::io("creating config dir", config_dir, e))?;

        let pid_path = config_dir.join(&settings.pid_name);
        claim_pid_file(&pid_path)?;

        let started = Self::start(config_dir, &settings);
        let (service, manager) = match started {
            Ok(parts) => parts,
            Err(e) => {
                let _ = std::fs::remove_file(&pid_path);
                return Err(e);
            }
        };

        let (sender, receiver) = mpsc::channel();
        info!(pid = std::process::id(), dir = %config_dir.display(), "daemon started");
        Ok(Daemon {
            settings,
            service,
            manager,
            receiver,
            handle: DaemonHandle { sender },
            pid_path,
        })
    }

    fn start(
        config_dir: &Path,
        settings: &Settings,
    ) -> Result<(ServiceSocket, Arc<SessionManager>), TerminalError> {
        let dispatcher = Arc::new(Dispatcher::from_settings(settings)?);
        let manager = Arc::new(SessionManager::new(
            dispatcher,
            Duration::from_millis(settings.request_timeout_ms),
        ));
        let socket_path = config_dir.join(&settings.socket_name);
        let service = ServiceSocket::bind(&socket_path, Arc::clone(&manager), settings.max_frame_bytes)?;
        Ok((service, manager))
    }

    pub fn handle(&self) -> DaemonHandle {
        self.handle.clone()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.manager
    }

    pub fn socket_path(&self) -> &Path {
        self.service.path()
    }

    /// Run until shutdown, then clean up.
    pub fn run(&mut self) -> Result<(), TerminalError> {
        while !self.tick() {}
        self.shutdown();
        Ok(())
    }

    /// Run exactly one tick of the main loop.
    /// Returns true if shutdown was requested.
    pub fn tick(&mut self) -> bool {
        if self.drain_channel() {
            return true;
        }

        let poll = Duration::from_millis(self.settings.socket_poll_ms);
        if let Err(e) = self.service.accept_nonblocking(poll) {
            error!(error = %e, "socket error");
        }

        self.service.shutdown_requested()
    }

    /// Returns true if a Shutdown event was received.
    fn drain_channel(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(DaemonEvent::Shutdown) => true,
            Err(mpsc::TryRecvError::Empty) => false,
            // Unreachable while we hold our own sender.
            Err(mpsc::TryRecvError::Disconnected) => true,
        }
    }

    /// Drop every client, end every session, remove the socket and pid files.
    pub fn shutdown(&mut self) {
        self.service.shutdown();
        self.manager.close_all();
        let _ = std::fs::remove_file(&self.pid_path);
        info!("daemon stopped");
    }
}


// ---------------------------------------------------------------------------
// Pid file
// ---------------------------------------------------------------------------

/// Pid recorded in a pid file, if it holds a usable one. Zero and values
/// that do not fit a `pid_t` would make `kill` address a process group.
pub fn read_pid(path: &Path) -> Option<u32> {
    let pid: u32 = std::fs::read_to_string(path).ok()?.trim().parse().ok()?;
    (pid > 0 && libc::pid_t::try_from(pid).is_ok()).then_some(pid)
}


/// Check if a process with the given pid is alive.
pub fn is_pid_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // kill(pid, 0) checks if the process exists without sending a signal
    unsafe { libc::kill(pid, 0) == 0 }
}


/// Fail if a live daemon owns the pid file; otherwise write our pid.
fn claim_pid_file(path: &Path) -> Result<(), TerminalError> {
    if let Some(pid) = read_pid(path) {
        if is_pid_alive(pid) {
            return Err(TerminalError::AlreadyRunning(pid));
        }
    }
    std::fs::write(path, std::process::id().to_string())
        .map_err(|e| TerminalError::io("writing pid file", path, e))
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TerminalClient;

    fn fast_settings() -> Settings {
        Settings {
            socket_poll_ms: 10,
            ..Settings::default()
        }
    }

    #[test]
    fn daemon_writes_pid_and_socket() {
        let dir = tempfile::tempdir().unwrap();
        let mut daemon = Daemon::with_settings(dir.path(), fast_settings()).unwrap();
        assert!(daemon.socket_path().exists());
        assert_eq!(read_pid(&dir.path().join("terminal.pid")), Some(std::process::id()));

        daemon.shutdown();
        assert!(!dir.path().join("terminal.sock").exists());
        assert!(!dir.path().join("terminal.pid").exists());
    }

    #[test]
    fn second_daemon_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Daemon::with_settings(dir.path(), fast_settings()).unwrap();
        let second = Daemon::with_settings(dir.path(), fast_settings());
        assert!(matches!(second, Err(TerminalError::AlreadyRunning(pid)) if pid == std::process::id()));
        first.shutdown();
    }

    #[test]
    fn stale_pid_file_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        // Above any real pid_max.
        std::fs::write(dir.path().join("terminal.pid"), "999999999").unwrap();
        let mut daemon = Daemon::with_settings(dir.path(), fast_settings()).unwrap();
        daemon.shutdown();
    }

    #[test]
    fn unusable_pids_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terminal.pid");
        for junk in ["0", "4294967295", "2147483648", "-1", "abc"] {
            std::fs::write(&path, junk).unwrap();
            assert_eq!(read_pid(&path), None, "{}", junk);
        }
        assert!(!is_pid_alive(0));
        assert!(!is_pid_alive(u32::MAX));

        std::fs::write(&path, "0").unwrap();
        let mut daemon = Daemon::with_settings(dir.path(), fast_settings()).unwrap();
        daemon.shutdown();
    }

    #[test]
    fn handle_shutdown_stops_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut daemon = Daemon::with_settings(dir.path(), fast_settings()).unwrap();
        assert!(!daemon.tick());
        daemon.handle().shutdown().unwrap();
        assert!(daemon.tick());
        daemon.shutdown();
    }

    #[test]
    fn run_serves_until_client_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = fast_settings();
        settings.users.push(crate::types::config::UserConfig {
            name: "alice".into(),
            roles: vec!["User".into()],
            aliases: Default::default(),
        });
        let mut daemon = Daemon::with_settings(dir.path(), settings).unwrap();
        let socket = daemon.socket_path().to_path_buf();
        let thread = std::thread::spawn(move || daemon.run());

        let timeout = Duration::from_secs(5);
        let mut client = TerminalClient::connect(&socket, timeout, 1 << 20).unwrap();
        let hello = client.login("alice").unwrap();
        assert_eq!(hello.texts(), vec!["You are currently logged in as alice."]);
        let reply = client.send("SAMPLE --count=2").unwrap();
        assert_eq!(reply.texts(), vec!["Iteration 1", "Iteration 2"]);
        client.logout().unwrap();

        TerminalClient::connect(&socket, timeout, 1 << 20)
            .unwrap()
            .shutdown()
            .unwrap();
        thread.join().unwrap().unwrap();
        assert!(!socket.exists());
    }
}
