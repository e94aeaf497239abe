//! Error types for event source operations

use thiserror::Error;

/// Result type alias for event source client operations
pub type Result<T> = std::result::Result<T, EventSourceError>;

/// Errors surfaced synchronously to the caller of the client API
///
/// Stream-time faults never show up here: they are logged by the read loop
/// and observable only through [`ClientState`](crate::ClientState).
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// Endpoint could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// `start()` was already called on this client
    #[error("Already started")]
    AlreadyStarted,

    /// `start()` was called without any data observer registered
    #[error("No listeners assigned")]
    NoObservers,

    /// Observer registration attempted after `start()`
    #[error("Observers cannot be registered after the client has started")]
    RegistrationClosed,

    /// The client has been disposed
    #[error("Client has been disposed")]
    Disposed,

    /// `start()` was called outside of a Tokio runtime
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

impl EventSourceError {
    /// Whether this is a start-up error (double start or missing observer)
    pub fn is_startup_error(&self) -> bool {
        matches!(self, Self::AlreadyStarted | Self::NoObservers)
    }
}

/// Errors raised by a [`Transport`](crate::Transport) while opening or reading a stream
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP/connection error
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream was closed before it could be opened
    #[error("Stream closed")]
    Closed,

    /// A single line outgrew the decoder's buffer limit
    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

impl TransportError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }
}

/// Failure to decode the payload of a `data:` line
#[derive(Debug, Error)]
#[error("Failed to decode payload: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// Error returned by an observer callback
pub type ObserverError = anyhow::Error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors() {
        assert!(EventSourceError::AlreadyStarted.is_startup_error());
        assert!(EventSourceError::NoObservers.is_startup_error());
        assert!(!EventSourceError::Disposed.is_startup_error());
        assert!(!EventSourceError::RegistrationClosed.is_startup_error());
    }

    #[test]
    fn test_server_error_display() {
        let err = TransportError::server_error(503, "unavailable");
        assert_eq!(err.to_string(), "Server error (503): unavailable");
    }

    #[test]
    fn test_line_too_long_display() {
        let err = TransportError::LineTooLong { limit: 16 };
        assert_eq!(err.to_string(), "Line exceeds 16 bytes");
    }
}
