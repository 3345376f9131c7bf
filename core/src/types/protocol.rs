use serde::{Deserialize, Serialize};

use crate::output::DisplayDirective;


/// Frames a client sends over the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Open a session for this user. Must come first on a connection.
    Login { user: String },
    /// One raw input line for the session.
    Input { line: String },
    /// End the session and close the connection.
    Logout,
    /// Ask the daemon to stop.
    Shutdown,
}


/// Frames the server sends back, one per client frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        output: Vec<DisplayDirective>,
        /// Label to show next to the command line, if a context set one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        #[serde(default)]
        prompt_active: bool,
    },
    Error { message: String },
}

impl Response {
    pub fn empty() -> Response {
        Response::Ok {
            output: Vec::new(),
            prompt: None,
            prompt_active: false,
        }
    }
}
