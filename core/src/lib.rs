//! Terminal core: A multi-user, command-driven text terminal.
//!
//! One `Dispatcher` turns a session's raw input line into a handler call,
//! honouring the session's context (passive, forced prompt, or none), the
//! user's aliases and the command's role requirement. Sessions run on their
//! own worker threads; the daemon serves them over a Unix socket.
//!
//! # Modules
//!
//! - [`context`]: Per-session context state machine with backup stack
//! - [`dispatch`]: Line resolution and handler invocation
//! - [`registry`]: Command descriptors, roles and lookup
//! - [`commands`]: Built-in commands
//! - [`session`]: Per-session workers
//! - [`service`] / [`client`] / [`daemon`]: Socket server and client

pub mod alias;
pub mod client;
pub mod commands;
pub mod context;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod options;
pub mod output;
pub mod registry;
pub mod service;
pub mod session;
pub mod settings;
pub mod store;
pub mod types;
pub mod users;

pub use dispatch::{Dispatcher, Reply};
pub use error::{DispatchError, TerminalError};
pub use session::{SessionId, SessionManager};
