//! Error types for the chat client
//!
//! Defines connection-level errors and action send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Connection-level errors
///
/// Covers the terminal conditions a session can surface. Transient
/// transport failures are represented as status changes, not errors, and
/// message-scoped failures live on the affected `ChatMessage`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No credential available; raised before any network attempt
    #[error("authentication credential missing")]
    MissingCredential,

    /// The server closed the channel with an authentication-rejection code
    #[error("authentication rejected by server")]
    AuthRejected,

    /// An action that requires an open channel was attempted while closed
    #[error("not connected")]
    NotConnected,

    /// Configured endpoint could not be parsed
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configured endpoint uses a scheme the transport cannot dial
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
}

/// Action send errors
///
/// Occurs when invoking an action on a session whose actor task has
/// already terminated.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session actor is gone; its command channel is closed
    #[error("session closed")]
    SessionClosed,
}
