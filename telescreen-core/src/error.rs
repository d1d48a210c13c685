//! Domain-specific error types for the telescreen protocol.
//!
//! All fallible operations return `Result<T, TsError>`.
//! No panics on invalid input; every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the telescreen protocol.
#[derive(Debug, Error)]
pub enum TsError {
    // ── Connection Errors ────────────────────────────────────────
    /// The peer closed the connection, possibly mid-frame.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The TLS handshake or record layer failed.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// The configured host name is not a valid TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Protocol Errors ──────────────────────────────────────────
    /// A frame payload failed to parse into a known message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The length prefix exceeds the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Serializing a message failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Application Errors ───────────────────────────────────────
    /// A received screenshot could not be decoded as an image.
    #[error("image decode error: {0}")]
    ImageDecode(String),

    /// An OS capture or injection capability failed.
    #[error("capability error: {0}")]
    Capability(String),

    /// Invalid or unusable configuration (bad paths, bad PEM, etc.).
    #[error("config error: {0}")]
    Config(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<image::ImageError> for TsError {
    fn from(e: image::ImageError) -> Self {
        TsError::ImageDecode(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TsError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        TsError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = TsError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = TsError::Protocol("bad tag".into());
        assert!(e.to_string().contains("bad tag"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: TsError = io_err.into();
        assert!(matches!(e, TsError::Connection(_)));
    }
}
