//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur while dispatching notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Remote client could not be built from the configured key/URL
    #[error("Client construction failed: {0}")]
    ClientConstruction(String),

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status
    #[error("Remote call returned {status}: {body}")]
    Remote {
        status: u16,
        request_id: Option<String>,
        body: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Message status is none of critical, warning or passing
    #[error("Unclassified status '{status}' for alias {alias}")]
    UnclassifiedStatus { alias: String, status: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl NotifyError {
    /// Request id reported by the remote service, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Remote { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
