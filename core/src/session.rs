//! Sessions: One worker thread per connected user.
//!
//! Each session's `SessionContext` lives on its own worker thread and is
//! touched by nothing else. Requests for a session queue on an mpsc channel
//! and run strictly in arrival order; different sessions run in parallel and
//! share only the `Dispatcher` (read-only registry, synchronized stores).
//!
//! Closing a session marks it cancelled and drops its queue. A request
//! already running finishes; queued ones are discarded along with the
//! context. Nothing about an in-flight prompt survives a reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::context::SessionContext;
use crate::dispatch::{Dispatcher, Reply};
use crate::error::TerminalError;


pub type SessionId = u64;


/// The state owned by one session worker.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user: String,
    pub context: SessionContext,
}

impl Session {
    /// A new session starts with a Disabled context.
    pub fn new(id: SessionId, user: impl Into<String>) -> Session {
        Session {
            id,
            user: user.into(),
            context: SessionContext::new(),
        }
    }
}


struct Request {
    line: String,
    reply: mpsc::Sender<Reply>,
}


struct Worker {
    sender: mpsc::Sender<Request>,
    cancelled: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}


/// Owns every live session worker.
pub struct SessionManager {
    dispatcher: Arc<Dispatcher>,
    workers: Mutex<HashMap<SessionId, Worker>>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl SessionManager {
    pub fn new(dispatcher: Arc<Dispatcher>, request_timeout: Duration) -> SessionManager {
        SessionManager {
            dispatcher,
            workers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            request_timeout,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Start a session for `user` and return its id.
    pub fn open(&self, user: &str) -> Result<SessionId, TerminalError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel::<Request>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let dispatcher = Arc::clone(&self.dispatcher);
        let flag = Arc::clone(&cancelled);
        let session = Session::new(id, user);
        let thread = std::thread::Builder::new()
            .name(format!("session-{}", id))
            .spawn(move || run_worker(dispatcher, session, receiver, flag))
            .map_err(TerminalError::Spawn)?;

        self.lock_workers()?.insert(
            id,
            Worker {
                sender,
                cancelled,
                thread,
            },
        );
        info!(session = id, user, "session opened");
        Ok(id)
    }

    /// Run one input line on a session and wait for its reply.
    ///
    /// The caller is not holding any lock while the worker runs, so a slow
    /// handler in one session never stalls another.
    pub fn handle(&self, id: SessionId, line: &str) -> Result<Reply, TerminalError> {
        let sender = {
            let workers = self.lock_workers()?;
            workers
                .get(&id)
                .map(|w| w.sender.clone())
                .ok_or(TerminalError::UnknownSession(id))?
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        sender
            .send(Request {
                line: line.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| TerminalError::SessionClosed(id))?;

        reply_rx.recv_timeout(self.request_timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => TerminalError::Timeout(id),
            mpsc::RecvTimeoutError::Disconnected => TerminalError::SessionClosed(id),
        })
    }

    /// End a session. Returns false when the id was not open.
    pub fn close(&self, id: SessionId) -> bool {
        let worker = match self.lock_workers() {
            Ok(mut workers) => workers.remove(&id),
            Err(_) => None,
        };
        let Some(worker) = worker else {
            return false;
        };
        worker.cancelled.store(true, Ordering::SeqCst);
        drop(worker.sender);
        if worker.thread.join().is_err() {
            debug!(session = id, "session worker panicked");
        }
        true
    }

    /// Close every open session.
    pub fn close_all(&self) {
        let ids: Vec<SessionId> = match self.lock_workers() {
            Ok(workers) => workers.keys().copied().collect(),
            Err(_) => Vec::new(),
        };
        for id in ids {
            self.close(id);
        }
    }

    pub fn is_open(&self, id: SessionId) -> bool {
        self.lock_workers()
            .map(|w| w.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn session_count(&self) -> usize {
        self.lock_workers().map(|w| w.len()).unwrap_or(0)
    }

    fn lock_workers(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, Worker>>, TerminalError> {
        self.workers
            .lock()
            .map_err(|_| TerminalError::Protocol("session table lock poisoned".into()))
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}


fn run_worker(
    dispatcher: Arc<Dispatcher>,
    mut session: Session,
    receiver: mpsc::Receiver<Request>,
    cancelled: Arc<AtomicBool>,
) {
    while let Ok(request) = receiver.recv() {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        let reply = dispatcher.handle(&mut session, &request.line);
        // The requester may have timed out and gone away.
        let _ = request.reply.send(reply);
    }
    info!(session = session.id, user = %session.user, "session closed");
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
