//! Caller-facing session surface
//!
//! `ChatHandle` is the cloneable handle the UI layer keeps: a small action
//! API plus observable state. All calls are forwarded to the session actor;
//! nothing here blocks or touches the socket directly.

use tokio::sync::{mpsc, watch};

use crate::error::SendError;
use crate::session::SessionCommand;
use crate::transcript::ChatMessage;
use crate::types::{ConnectionStatus, EnrichmentLevel, SessionId};

/// Out-of-band notifications for callers that want more than snapshots
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// An assistant reply was finalized (content is now immutable)
    MessageCommitted(ChatMessage),
}

/// Observable session state
///
/// A self-contained snapshot; cheap to clone and safe to hand to any
/// renderer. A fresh one is published on every state change.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub status: ConnectionStatus,
    pub session_id: Option<SessionId>,
    pub messages: Vec<ChatMessage>,
    pub is_typing: bool,
    pub remote_typing: bool,
    pub last_error: Option<String>,
}

/// Handle to a running chat session
///
/// Dropping every clone of the handle tears the session down: timers are
/// cancelled and the channel is closed with the normal-closure code.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<ChatState>,
}

impl ChatHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<ChatState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Submit a user message
    ///
    /// Blank content is ignored; while not connected the session surfaces
    /// a "not connected" condition in its state instead of erroring here.
    pub async fn send_message(
        &self,
        content: impl Into<String>,
        enrichment: EnrichmentLevel,
    ) -> Result<(), SendError> {
        self.send(SessionCommand::SendMessage {
            content: content.into(),
            enrichment,
        })
        .await
    }

    /// Signal local typing activity (debounced by the session)
    pub async fn start_typing(&self) -> Result<(), SendError> {
        self.send(SessionCommand::StartTyping).await
    }

    /// Explicitly stop the local typing indicator
    pub async fn stop_typing(&self) -> Result<(), SendError> {
        self.send(SessionCommand::StopTyping).await
    }

    /// Reset the retry budget and reopen the channel immediately
    pub async fn reconnect(&self) -> Result<(), SendError> {
        self.send(SessionCommand::Reconnect).await
    }

    /// Empty the transcript; connection state is unaffected
    pub async fn clear_messages(&self) -> Result<(), SendError> {
        self.send(SessionCommand::ClearMessages).await
    }

    /// Close the channel cleanly and cancel all pending timers
    pub async fn disconnect(&self) -> Result<(), SendError> {
        self.send(SessionCommand::Disconnect).await
    }

    /// Current state snapshot
    pub fn state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn watch(&self) -> watch::Receiver<ChatState> {
        self.state.clone()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SendError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| SendError::SessionClosed)
    }
}
