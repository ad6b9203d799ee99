//! Basic type definitions for the chat client
//!
//! Provides newtype wrappers for type safety:
//! - `ConversationId`: identifies the conversation a session is bound to
//! - `SessionId`: server-assigned id issued on a successful handshake
//! - `MessageId`: identifies one chat message (server- or locally-generated)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation identifier (newtype pattern)
///
/// One WebSocket channel is opened per conversation. The id becomes part
/// of the endpoint path, so it is kept as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session identifier issued by the server
///
/// Carried in the `connected` frame. None until the handshake completes,
/// cleared again on every disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat message identifier
///
/// Assistant messages carry server-assigned ids; optimistic user messages
/// get a locally generated id in the `local-` namespace so a future
/// protocol version that echoes user messages can reconcile them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

/// Prefix marking ids generated on this client rather than by the server.
const LOCAL_ID_PREFIX: &str = "local-";

impl MessageId {
    /// Generate a new local message id (UUID v4 in the `local-` namespace)
    pub fn generate() -> Self {
        Self(format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()))
    }

    /// Whether this id was generated locally (unconfirmed by the server)
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Requested depth of the assistant's reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentLevel {
    Quick,
    #[default]
    Standard,
    Detailed,
}

/// Connection lifecycle state
///
/// Exactly one per session; the single source of truth for whether
/// sending is permitted. `Error` is terminal for the session when caused
/// by a missing credential or an authentication rejection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_id_unique() {
        let id1 = MessageId::generate();
        let id2 = MessageId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_local_id_namespace() {
        let local = MessageId::generate();
        assert!(local.is_local());

        let server = MessageId("msg-42".to_string());
        assert!(!server.is_local());
    }

    #[test]
    fn test_enrichment_default() {
        assert_eq!(EnrichmentLevel::default(), EnrichmentLevel::Standard);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }
}
