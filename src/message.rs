//! Wire protocol definitions
//!
//! JSON-based bidirectional frame protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Inbound frames with an
//! unknown discriminant or a malformed body are dropped, never surfaced.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{EnrichmentLevel, MessageId, SessionId};

/// A citation backing part of an assistant reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Client → Server frame
///
/// Everything the client ever puts on the wire. Uses tagged enum with
/// snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Submit a user message
    ChatMessage {
        content: String,
        enrichment: EnrichmentLevel,
    },
    /// Local user started typing
    TypingStart,
    /// Local user stopped typing
    TypingStop,
    /// Keep-alive ping
    Ping,
}

/// Server → Client frame
///
/// Everything the server is known to send. Uses tagged enum with
/// snake_case naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake complete, session id issued
    Connected { session_id: SessionId },
    /// Incremental fragment of a streaming assistant reply
    ChatToken { message_id: MessageId, token: String },
    /// Streaming reply finished; content is the authoritative final value
    ChatComplete {
        message_id: MessageId,
        content: String,
        sources: Option<Vec<Source>>,
    },
    /// A reply failed server-side; scoped to one message
    ChatError { message_id: MessageId, error: String },
    /// Remote typing indicator
    TypingIndicator { is_typing: bool },
    /// Citations for an already-delivered message
    SourceCitation {
        message_id: MessageId,
        sources: Vec<Source>,
    },
    /// Keep-alive reply
    Pong,
}

impl ServerFrame {
    /// Parse an inbound text frame
    ///
    /// Returns None for frames that fail to parse or carry an unrecognized
    /// discriminant. Dropping them keeps the client forward-compatible with
    /// newer servers.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("Dropping undecodable frame: {}", e);
                None
            }
        }
    }
}
