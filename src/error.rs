//! Error types for FollowGraph
//!
//! One error enum covers every failure mode from argument validation up to the
//! HTTP surface. Uses thiserror for ergonomic error handling.
//!
//! The enum is `Clone`: the batching connector hands a single fetch outcome to
//! every caller coalesced on the same address, failures included.

use thiserror::Error;

/// Result type alias for FollowGraph operations
pub type Result<T> = std::result::Result<T, FollowGraphError>;

/// Comprehensive error type for FollowGraph operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FollowGraphError {
    /// Caller supplied an invalid or empty argument; raised before any network access
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network-level failure reaching the backend (including non-2xx statuses)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend responded but the body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// One per-item load of a list fan-out failed, failing the whole list
    #[error("Fan-out failed for '{login}': {source}")]
    PartialFanout {
        login: String,
        source: Box<FollowGraphError>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// HTTP surface errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),
}

impl FollowGraphError {
    /// Stable short name for the error class, used on the wire and in client status
    pub fn kind(&self) -> &'static str {
        match self {
            FollowGraphError::Validation(_) => "validation",
            FollowGraphError::Transport(_) => "transport",
            FollowGraphError::Decode(_) => "decode",
            FollowGraphError::PartialFanout { .. } => "partial_fanout",
            FollowGraphError::Config(_) => "config",
            FollowGraphError::Io(_) => "io",
            FollowGraphError::Server(_) => "server",
        }
    }

    /// Rebuild an error from its wire form (`kind` + message)
    ///
    /// Fan-out failures lose their item detail across the wire and come back
    /// with the message as the inner transport failure.
    pub fn from_kind(kind: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            "validation" => FollowGraphError::Validation(message),
            "transport" => FollowGraphError::Transport(message),
            "decode" => FollowGraphError::Decode(message),
            "partial_fanout" => FollowGraphError::PartialFanout {
                login: String::new(),
                source: Box::new(FollowGraphError::Transport(message)),
            },
            "config" => FollowGraphError::Config(message),
            "io" => FollowGraphError::Io(message),
            _ => FollowGraphError::Server(message),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, FollowGraphError::Validation(_))
    }
}

/// The request URL is stripped: it may carry the access token as a query parameter
impl From<reqwest::Error> for FollowGraphError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_decode() {
            FollowGraphError::Decode(e.to_string())
        } else {
            FollowGraphError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FollowGraphError {
    fn from(e: serde_json::Error) -> Self {
        FollowGraphError::Decode(e.to_string())
    }
}

impl From<serde_yaml::Error> for FollowGraphError {
    fn from(e: serde_yaml::Error) -> Self {
        FollowGraphError::Config(e.to_string())
    }
}

impl From<std::io::Error> for FollowGraphError {
    fn from(e: std::io::Error) -> Self {
        FollowGraphError::Io(e.to_string())
    }
}
