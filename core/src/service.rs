//! Service socket: The Unix socket clients talk to.
//!
//! # Wire format
//!
//! Every frame, both ways, is a 4-byte big-endian length followed by that
//! many bytes of JSON. Clients send `ClientFrame`s; the server answers each
//! one with exactly one `Response`.
//!
//! # Connections
//!
//! A connection is a conversation: `login` opens a session, each `input`
//! runs one line on it, and `logout` (or disconnecting) closes it. Every
//! accepted connection gets its own thread, so a user waiting at a prompt
//! never holds up anyone else.

use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::TerminalError;
use crate::session::{SessionId, SessionManager};
use crate::types::protocol::{ClientFrame, Response};


/// Line every client sends right after login.
const INITIALIZE_LINE: &str = "INITIALIZE";


// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Read one length-prefixed JSON frame.
pub fn read_frame<T: DeserializeOwned>(stream: &mut impl Read, limit: usize) -> Result<T, TerminalError> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .map_err(|e| TerminalError::socket("reading frame length", e))?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len == 0 {
        return Err(TerminalError::EmptyFrame);
    }
    if len > limit {
        return Err(TerminalError::FrameTooLarge { len, limit });
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .map_err(|e| TerminalError::socket("reading frame payload", e))?;

    serde_json::from_slice(&payload).map_err(TerminalError::MalformedFrame)
}


/// Write one length-prefixed JSON frame. A payload over `limit` is refused
/// before anything reaches the stream, so the peer stays in sync.
pub fn write_frame<T: Serialize>(stream: &mut impl Write, value: &T, limit: usize) -> Result<(), TerminalError> {
    let json = serde_json::to_vec(value).map_err(TerminalError::MalformedFrame)?;
    let limit = limit.min(u32::MAX as usize);
    if json.len() > limit {
        return Err(TerminalError::FrameTooLarge { len: json.len(), limit });
    }
    let len = json.len() as u32;
    stream
        .write_all(&len.to_be_bytes())
        .map_err(|e| TerminalError::socket("writing frame length", e))?;
    stream
        .write_all(&json)
        .map_err(|e| TerminalError::socket("writing frame payload", e))?;
    stream
        .flush()
        .map_err(|e| TerminalError::socket("flushing frame", e))
}


/// True when the peer simply went away.
fn is_disconnect(e: &TerminalError) -> bool {
    match e {
        TerminalError::Socket { source, .. } => matches!(
            source.kind(),
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}


// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Serve one client until it logs out, disconnects, or asks for shutdown.
///
/// Returns true when the client requested a daemon shutdown.
pub fn serve_connection(
    mut stream: UnixStream,
    manager: &SessionManager,
    limit: usize,
) -> Result<bool, TerminalError> {
    let mut session: Option<SessionId> = None;
    let result = converse(&mut stream, manager, limit, &mut session);
    if let Some(id) = session {
        manager.close(id);
    }
    result
}


fn converse(
    stream: &mut UnixStream,
    manager: &SessionManager,
    limit: usize,
    session: &mut Option<SessionId>,
) -> Result<bool, TerminalError> {
    loop {
        let frame: ClientFrame = match read_frame(stream, limit) {
            Ok(frame) => frame,
            Err(e) if is_disconnect(&e) => return Ok(false),
            Err(e @ TerminalError::MalformedFrame(_)) | Err(e @ TerminalError::EmptyFrame) => {
                // The stream is still in sync; report and keep going.
                debug!(error = %e, "bad frame");
                write_frame(stream, &Response::Error { message: e.to_string() }, limit)?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let response = match frame {
            ClientFrame::Login { user } => {
                if let Some(old) = session.take() {
                    manager.close(old);
                }
                let id = manager.open(&user)?;
                *session = Some(id);
                respond(manager.handle(id, INITIALIZE_LINE))
            }
            ClientFrame::Input { line } => match *session {
                Some(id) => respond(manager.handle(id, &line)),
                None => Response::Error {
                    message: "not logged in".into(),
                },
            },
            ClientFrame::Logout => {
                write_frame(stream, &Response::empty(), limit)?;
                return Ok(false);
            }
            ClientFrame::Shutdown => {
                write_frame(stream, &Response::empty(), limit)?;
                return Ok(true);
            }
        };
        match write_frame(stream, &response, limit) {
            Err(TerminalError::FrameTooLarge { len, limit }) => {
                warn!(len, limit, "reply too large to send");
                let message = format!("reply too large: {} bytes (limit {})", len, limit);
                write_frame(stream, &Response::Error { message }, limit)?;
            }
            other => other?,
        }
    }
}


fn respond(result: Result<crate::dispatch::Reply, TerminalError>) -> Response {
    match result {
        Ok(reply) => reply.into(),
        Err(e) => Response::Error { message: e.to_string() },
    }
}


// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

struct Connection {
    stream: UnixStream,
    thread: JoinHandle<()>,
}


/// Unix socket listener. Accepting is non-blocking with a poll timeout so
/// the daemon loop can interleave other work.
pub struct ServiceSocket {
    listener: UnixListener,
    path: PathBuf,
    manager: Arc<SessionManager>,
    max_frame_bytes: usize,
    shutdown_requested: Arc<AtomicBool>,
    connections: Mutex<Vec<Connection>>,
}

impl ServiceSocket {
    /// Bind at `path`, removing a stale socket file first.
    pub fn bind(
        path: &Path,
        manager: Arc<SessionManager>,
        max_frame_bytes: usize,
    ) -> Result<ServiceSocket, TerminalError> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| TerminalError::io("removing stale socket", path, e))?;
        }
        let listener = UnixListener::bind(path).map_err(|e| TerminalError::io("binding socket", path, e))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| TerminalError::socket("setting non-blocking", e))?;
        info!(path = %path.display(), "listening");
        Ok(ServiceSocket {
            listener,
            path: path.to_path_buf(),
            manager,
            max_frame_bytes,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            connections: Mutex::new(Vec::new()),
        })
    }

    /// Accept connections until `timeout` passes. Returns how many were
    /// accepted.
    pub fn accept_nonblocking(&self, timeout: Duration) -> Result<usize, TerminalError> {
        let deadline = Instant::now() + timeout;
        let poll_interval = Duration::from_millis(10);
        let mut accepted = 0;

        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    self.spawn_connection(stream)?;
                    accepted += 1;
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    std::thread::sleep(poll_interval);
                }
                Err(e) => return Err(TerminalError::socket("accepting", e)),
            }
        }
        self.reap_finished();
        Ok(accepted)
    }

    fn spawn_connection(&self, stream: UnixStream) -> Result<(), TerminalError> {
        // Accepted sockets may inherit non-blocking mode on some platforms.
        stream
            .set_nonblocking(false)
            .map_err(|e| TerminalError::socket("setting blocking", e))?;
        let handle = stream
            .try_clone()
            .map_err(|e| TerminalError::socket("cloning stream", e))?;

        let manager = Arc::clone(&self.manager);
        let flag = Arc::clone(&self.shutdown_requested);
        let limit = self.max_frame_bytes;
        let thread = std::thread::Builder::new()
            .name("connection".into())
            .spawn(move || match serve_connection(stream, &manager, limit) {
                Ok(true) => {
                    info!("shutdown requested by client");
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "connection ended with error"),
            })
            .map_err(TerminalError::Spawn)?;

        if let Ok(mut connections) = self.connections.lock() {
            connections.push(Connection { stream: handle, thread });
        }
        Ok(())
    }

    fn reap_finished(&self) {
        if let Ok(mut connections) = self.connections.lock() {
            connections.retain(|c| !c.thread.is_finished());
        }
    }

    /// True once a client has sent a shutdown frame.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> usize {
        self.reap_finished();
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hang up on every client, wait for their threads, and remove the
    /// socket file.
    pub fn shutdown(&self) {
        let connections = match self.connections.lock() {
            Ok(mut connections) => std::mem::take(&mut *connections),
            Err(_) => Vec::new(),
        };
        for connection in connections {
            let _ = connection.stream.shutdown(Shutdown::Both);
            let _ = connection.thread.join();
        }
        Self::cleanup(&self.path);
    }

    /// Remove a socket file, ignoring errors.
    pub fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
