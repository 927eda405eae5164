//! Error types for racectl-core

use thiserror::Error;

/// Result type alias using racectl-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in racectl-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server responded with a non-success status outside the content taxonomy
    #[error("API error: {0}")]
    Api(String),

    /// Race, runner, or result not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate natural key, or race in the wrong lifecycle state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or malformed field
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Manual sync was requested while disconnected
    #[error("Cannot sync while offline")]
    Offline,

    /// A queued operation references a provisional identity that has no
    /// authoritative counterpart yet
    #[error("Identity not yet resolvable: {0}")]
    UnresolvedIdentity(String),
}

impl Error {
    /// Whether the server rejected the operation's content rather than its
    /// delivery. Terminal failures are never worth retrying; everything else
    /// stays queued for the next drain.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Conflict(_) | Self::Invalid(_)
        )
    }
}
