//! Chat transcript and streaming assembly
//!
//! `Transcript` owns the ordered message list plus the per-message buffers
//! that accumulate token fragments while an assistant reply streams in.
//! Buffers exist only between the first token and the completion (or error)
//! for an id; content only grows by append until finalized.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::message::Source;
use crate::types::{EnrichmentLevel, MessageId, Role};

/// One chat message as the caller sees it
///
/// `content` is mutable while `is_streaming` is true and frozen once the
/// reply is finalized. A per-message `error` leaves any partial content in
/// place so the caller can still show what arrived.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub is_streaming: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentLevel>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatMessage {
    /// Create an optimistic user message with a locally generated id
    pub fn user(content: impl Into<String>, enrichment: EnrichmentLevel) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            is_streaming: false,
            sources: None,
            enrichment: Some(enrichment),
            created_at: Utc::now(),
            error: None,
        }
    }

    /// Create an assistant message that is still streaming
    fn streaming(id: MessageId, content: String) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content,
            is_streaming: true,
            sources: None,
            enrichment: None,
            created_at: Utc::now(),
            error: None,
        }
    }
}

/// Ordered message list plus in-flight streaming buffers
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    buffers: HashMap<MessageId, String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in arrival order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append an optimistic user message and return a copy of it
    pub fn push_user(
        &mut self,
        content: impl Into<String>,
        enrichment: EnrichmentLevel,
    ) -> ChatMessage {
        let message = ChatMessage::user(content, enrichment);
        self.messages.push(message.clone());
        message
    }

    /// Apply a token fragment to the streaming reply with the given id
    ///
    /// Creates the buffer and the streaming message on first token;
    /// subsequent fragments append. Arrival order of messages is preserved.
    pub fn apply_token(&mut self, id: &MessageId, fragment: &str) {
        let content = {
            let buffer = self.buffers.entry(id.clone()).or_default();
            buffer.push_str(fragment);
            buffer.clone()
        };

        match self.find_mut(id) {
            Some(message) => {
                message.content = content;
                message.is_streaming = true;
            }
            None => self
                .messages
                .push(ChatMessage::streaming(id.clone(), content)),
        }
    }

    /// Finalize the reply with the given id
    ///
    /// The buffer is discarded and `content` replaces whatever accumulated;
    /// the server's value is authoritative. Returns a copy of the finalized
    /// message for the committed-message notification.
    pub fn apply_complete(
        &mut self,
        id: &MessageId,
        content: String,
        sources: Option<Vec<Source>>,
    ) -> ChatMessage {
        self.buffers.remove(id);

        match self.find_mut(id) {
            Some(message) => {
                message.is_streaming = false;
                message.content = content;
                message.sources = sources;
                message.clone()
            }
            None => {
                // Completion without prior tokens: create the message fresh
                debug!("Completion for {} arrived with no streaming message", id);
                let mut message = ChatMessage::streaming(id.clone(), content);
                message.is_streaming = false;
                message.sources = sources;
                self.messages.push(message.clone());
                message
            }
        }
    }

    /// Mark the reply with the given id as failed
    ///
    /// Partial content already streamed is retained so the caller can still
    /// show it alongside the error.
    pub fn apply_error(&mut self, id: &MessageId, error: String) {
        self.buffers.remove(id);

        match self.find_mut(id) {
            Some(message) => {
                message.is_streaming = false;
                message.error = Some(error);
            }
            None => {
                let mut message = ChatMessage::streaming(id.clone(), String::new());
                message.is_streaming = false;
                message.error = Some(error);
                self.messages.push(message);
            }
        }
    }

    /// Attach citations to an existing message; ignored if the id is unknown
    pub fn apply_sources(&mut self, id: &MessageId, sources: Vec<Source>) {
        if let Some(message) = self.find_mut(id) {
            message.sources = Some(sources);
        }
    }

    /// Drop all in-flight buffers without finalizing their messages
    ///
    /// Called on every closure: abandoned streams stay visibly unfinished
    /// rather than being silently completed.
    pub fn abandon_streams(&mut self) {
        self.buffers.clear();
    }

    /// Empty the message list and all buffers
    pub fn clear(&mut self) {
        self.messages.clear();
        self.buffers.clear();
    }

    fn find_mut(&mut self, id: &MessageId) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }
}
