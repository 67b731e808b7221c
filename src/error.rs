//! Error types for the harness.
//!
//! Only transport and configuration problems are errors. A response whose
//! content differs from the expected value is an observation, recorded by the
//! [`Verifier`](crate::verify::Verifier), and never surfaces here.

use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that abort a session (transport) or the whole batch (configuration).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    /// Invalid harness configuration, detected before any worker starts.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The HTTP client failed to deliver a request or read its response.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status where one is required.
    #[error("{step}: unexpected HTTP status {status}")]
    Status {
        /// Step that issued the request.
        step: &'static str,
        /// Status code returned by the service.
        status: u16,
    },

    /// The response body was not valid JSON.
    #[error("{step}: malformed response body: {source}")]
    Decode {
        /// Step that issued the request.
        step: &'static str,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The session token needed by a later step was never issued.
    #[error("Session cookie '{0}' was not set by the service")]
    MissingSession(String),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// An operation did not finish in time.
    #[error("Timed out during {0}")]
    Timeout(&'static str),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the WebSocket transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WsError {
    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in text frame.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Connection has been closed.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// Invalid WebSocket handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake response exceeded the configured limit.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes read so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Masked server frame (security violation).
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },
}

impl From<std::io::Error> for WsError {
    fn from(err: std::io::Error) -> Self {
        WsError::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for WsError {
    fn from(_: std::str::Utf8Error) -> Self {
        WsError::InvalidUtf8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WsError::MessageTooLarge {
            size: 70_000_000,
            max: 67_108_864,
        };
        assert_eq!(
            err.to_string(),
            "Message too large: 70000000 bytes (max: 67108864)"
        );
    }

    #[test]
    fn test_status_display_names_step() {
        let err = HarnessError::Status {
            step: "register",
            status: 500,
        };
        assert_eq!(err.to_string(), "register: unexpected HTTP status 500");
    }

    #[test]
    fn test_ws_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let ws_err: WsError = io_err.into();
        assert!(matches!(ws_err, WsError::Io(_)));

        let err: HarnessError = ws_err.into();
        assert!(matches!(err, HarnessError::WebSocket(WsError::Io(_))));
    }

    #[test]
    fn test_error_clone() {
        let err = WsError::InvalidUtf8;
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}
