use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Unified error type for the Moogie sync client
#[derive(Error, Debug)]
pub enum SyncError {
    // Transport errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Push channel is not connected")]
    NotConnected,

    // Decode errors
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    // Upstream read errors
    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    // Usage errors
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sync client operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure classes of the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connect or socket failures, handled by the reconnect policy
    Transport,
    /// Malformed envelope or payload, dropped per message
    Decode,
    /// Upstream read failures, captured into a store's error field
    Upstream,
    /// Caller supplied something invalid
    Usage,
}

impl SyncError {
    /// Get the failure class for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::WebSocket(_) | SyncError::Transport(_) | SyncError::NotConnected => {
                ErrorCategory::Transport
            }

            SyncError::Decode(_) => ErrorCategory::Decode,

            SyncError::HttpStatus { .. } | SyncError::Request(_) | SyncError::Io(_) => {
                ErrorCategory::Upstream
            }

            SyncError::InvalidRange(_) | SyncError::InvalidConfig(_) | SyncError::Url(_) => {
                ErrorCategory::Usage
            }
        }
    }

    /// Upstream HTTP status carried by this error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SyncError::HttpStatus { status, .. } => Some(*status),
            SyncError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error is handled by reconnecting
    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}
