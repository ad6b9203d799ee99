//! ChatSession actor implementation
//!
//! The actor that owns one conversation's channel and all its state:
//! socket, transcript, typing flags, heartbeat and reconnect timers.
//! Callers talk to it through `ChatHandle`; no locks needed - all state
//! access goes through message passing.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handle::{ChatEvent, ChatHandle, ChatState};
use crate::message::{ClientFrame, ServerFrame};
use crate::reconnect::ReconnectPolicy;
use crate::transcript::Transcript;
use crate::types::{ConnectionStatus, ConversationId, EnrichmentLevel, SessionId};
use crate::typing::TypingTracker;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Normal closure: caller-initiated clean close, no error, no retry
pub const CLOSE_NORMAL: u16 = 1000;

/// Credential invalid at handshake time; terminal, never retried
pub const CLOSE_AUTH_FAILED: u16 = 4001;

/// Credential expired or revoked mid-session; terminal, never retried
pub const CLOSE_AUTH_EXPIRED: u16 = 4003;

/// Buffer size for caller commands
const COMMAND_BUFFER_SIZE: usize = 32;

/// Buffer size for outbound events
const EVENT_BUFFER_SIZE: usize = 64;

/// Commands sent from `ChatHandle` to the session actor
#[derive(Debug)]
pub enum SessionCommand {
    /// Submit a user message
    SendMessage {
        content: String,
        enrichment: EnrichmentLevel,
    },
    /// Local user started typing
    StartTyping,
    /// Local user stopped typing
    StopTyping,
    /// Reset the retry budget and reopen the channel now
    Reconnect,
    /// Empty the transcript (connection unaffected)
    ClearMessages,
    /// Close the channel cleanly and cancel all pending timers
    Disconnect,
}

/// How a channel closure is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseKind {
    /// Clean close; no error, no retry
    Clean,
    /// Authentication rejection; terminal, surfaced as the session error
    AuthRejected,
    /// Anything else; eligible for the backoff policy
    Retryable,
}

/// Classify a close code (None when the channel dropped without one)
fn classify_close(code: Option<u16>) -> CloseKind {
    match code {
        Some(CLOSE_NORMAL) => CloseKind::Clean,
        Some(CLOSE_AUTH_FAILED) | Some(CLOSE_AUTH_EXPIRED) => CloseKind::AuthRejected,
        _ => CloseKind::Retryable,
    }
}

/// The session actor
///
/// Runs until every `ChatHandle` is dropped, at which point it cancels all
/// timers, closes the channel with the normal-closure code, and exits.
pub struct ChatSession {
    config: ClientConfig,
    conversation_id: ConversationId,
    credential: String,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Sender<ChatEvent>,
    state_tx: watch::Sender<ChatState>,
    socket: Option<WsStream>,
    status: ConnectionStatus,
    session_id: Option<SessionId>,
    transcript: Transcript,
    typing: TypingTracker,
    remote_typing: bool,
    reconnect: ReconnectPolicy,
    reconnect_at: Option<Instant>,
    heartbeat: Option<time::Interval>,
    last_error: Option<String>,
}

impl ChatSession {
    /// Start a session for one conversation
    ///
    /// Spawns the actor task and returns the caller-facing handle plus the
    /// event stream carrying finalized assistant replies.
    pub fn spawn(
        config: ClientConfig,
        conversation_id: ConversationId,
        credential: impl Into<String>,
    ) -> (ChatHandle, mpsc::Receiver<ChatEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        let (state_tx, state_rx) = watch::channel(ChatState::default());

        let typing = TypingTracker::new(config.typing_auto_stop);
        let reconnect = ReconnectPolicy::new(
            config.max_reconnect_attempts,
            config.reconnect_base_delay,
        );

        let session = Self {
            config,
            conversation_id,
            credential: credential.into(),
            commands: cmd_rx,
            events: event_tx,
            state_tx,
            socket: None,
            status: ConnectionStatus::Disconnected,
            session_id: None,
            transcript: Transcript::new(),
            typing,
            remote_typing: false,
            reconnect,
            reconnect_at: None,
            heartbeat: None,
            last_error: None,
        };
        tokio::spawn(session.run());

        (ChatHandle::new(cmd_tx, state_rx), event_rx)
    }

    /// Run the session event loop
    ///
    /// Opens the channel, then serializes caller commands, inbound frames
    /// and timer firings through a single select loop.
    async fn run(mut self) {
        self.open().await;

        loop {
            tokio::select! {
                maybe_cmd = self.commands.recv() => match maybe_cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        debug!("All handles dropped, shutting down session");
                        self.handle_disconnect().await;
                        break;
                    }
                },
                event = next_socket_event(&mut self.socket) => {
                    self.handle_socket_event(event).await;
                }
                _ = heartbeat_tick(&mut self.heartbeat) => {
                    debug!("Sending keep-alive ping");
                    self.send_frame(&ClientFrame::Ping).await;
                }
                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.open().await;
                }
                _ = sleep_until_opt(self.typing.deadline()) => {
                    self.expire_typing().await;
                }
            }
        }
    }

    /// Open the channel, or surface why it cannot be opened
    async fn open(&mut self) {
        if self.credential.is_empty() {
            warn!("No credential available; refusing to open channel");
            self.status = ConnectionStatus::Error;
            self.last_error = Some(ClientError::MissingCredential.to_string());
            self.publish();
            return;
        }

        let url = match self.config.endpoint(&self.conversation_id, &self.credential) {
            Ok(url) => url,
            Err(e) => {
                error!("Invalid endpoint: {}", e);
                self.status = ConnectionStatus::Error;
                self.last_error = Some(e.to_string());
                self.publish();
                return;
            }
        };

        self.status = ConnectionStatus::Connecting;
        self.publish();
        debug!("Opening channel for conversation {}", self.conversation_id);

        match connect_async(url.as_str()).await {
            Ok((socket, _response)) => {
                info!("Channel open for conversation {}", self.conversation_id);
                self.socket = Some(socket);
                self.status = ConnectionStatus::Connected;
                self.last_error = None;
                self.reconnect.reset();
                self.start_heartbeat();
                self.publish();
            }
            Err(e) => {
                warn!("Connect failed: {}", e);
                self.status = ConnectionStatus::Disconnected;
                self.schedule_retry();
                self.publish();
            }
        }
    }

    /// Process a single caller command
    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SendMessage {
                content,
                enrichment,
            } => {
                self.handle_send_message(content, enrichment).await;
            }
            SessionCommand::StartTyping => self.handle_start_typing().await,
            SessionCommand::StopTyping => self.handle_stop_typing().await,
            SessionCommand::Reconnect => self.handle_reconnect().await,
            SessionCommand::ClearMessages => {
                self.transcript.clear();
                self.publish();
            }
            SessionCommand::Disconnect => self.handle_disconnect().await,
        }
    }

    /// Handle message submission
    async fn handle_send_message(&mut self, content: String, enrichment: EnrichmentLevel) {
        if content.trim().is_empty() {
            return;
        }
        if self.status != ConnectionStatus::Connected {
            self.last_error = Some(ClientError::NotConnected.to_string());
            self.publish();
            return;
        }

        // Optimistic append before any server acknowledgment
        self.transcript.push_user(content.clone(), enrichment);
        self.typing.clear_local();
        self.publish();

        self.send_frame(&ClientFrame::ChatMessage {
            content,
            enrichment,
        })
        .await;
    }

    /// Handle local typing activity
    async fn handle_start_typing(&mut self) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        if self.typing.start() {
            self.send_frame(&ClientFrame::TypingStart).await;
        }
        self.publish();
    }

    /// Handle explicit local typing stop
    async fn handle_stop_typing(&mut self) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        if self.typing.stop() {
            self.send_frame(&ClientFrame::TypingStop).await;
            self.publish();
        }
    }

    /// The typing auto-stop window elapsed with no further keystrokes
    async fn expire_typing(&mut self) {
        debug!("Typing auto-stop window elapsed");
        if self.typing.stop() {
            self.send_frame(&ClientFrame::TypingStop).await;
            self.publish();
        }
    }

    /// Handle caller-invoked reconnect: full retry budget, open now
    async fn handle_reconnect(&mut self) {
        info!("Manual reconnect requested");
        self.reconnect.reset();
        self.reconnect_at = None;
        if let Some(mut socket) = self.socket.take() {
            let _ = socket
                .close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "reconnect".into(),
                }))
                .await;
            self.teardown_connection();
        }
        self.open().await;
    }

    /// Handle caller-invoked disconnect
    ///
    /// Cancels any pending retry before anything else so a late timer can
    /// never reopen a channel the caller asked to close.
    async fn handle_disconnect(&mut self) {
        info!("Disconnect requested");
        self.reconnect_at = None;
        if let Some(mut socket) = self.socket.take() {
            let _ = socket
                .close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client disconnect".into(),
                }))
                .await;
        }
        self.teardown_connection();
        self.status = ConnectionStatus::Disconnected;
        self.publish();
    }

    /// Process one event from the socket
    async fn handle_socket_event(&mut self, event: Option<Result<Message, WsError>>) {
        match event {
            Some(Ok(Message::Text(text))) => self.handle_frame(&text).await,
            Some(Ok(Message::Close(frame))) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                debug!("Close frame received: {:?}", code);
                self.handle_closure(code);
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                // Transport-level ping/pong is answered by tungstenite;
                // the protocol's pong arrives as a text frame
            }
            Some(Ok(_)) => {
                // Binary frames are not part of the protocol
            }
            Some(Err(e)) => {
                warn!("WebSocket error: {}", e);
                self.handle_closure(None);
            }
            None => {
                debug!("WebSocket stream ended");
                self.handle_closure(None);
            }
        }
    }

    /// Dispatch one inbound protocol frame
    async fn handle_frame(&mut self, text: &str) {
        let Some(frame) = ServerFrame::parse(text) else {
            return;
        };

        match frame {
            ServerFrame::Connected { session_id } => {
                info!("Session {} established", session_id);
                self.session_id = Some(session_id);
            }
            ServerFrame::ChatToken { message_id, token } => {
                self.transcript.apply_token(&message_id, &token);
            }
            ServerFrame::ChatComplete {
                message_id,
                content,
                sources,
            } => {
                let message = self.transcript.apply_complete(&message_id, content, sources);
                // Events are advisory; a lagging receiver is not an error
                let _ = self.events.try_send(ChatEvent::MessageCommitted(message));
            }
            ServerFrame::ChatError { message_id, error } => {
                warn!("Reply {} failed: {}", message_id, error);
                self.transcript.apply_error(&message_id, error);
            }
            ServerFrame::TypingIndicator { is_typing } => {
                self.remote_typing = is_typing;
            }
            ServerFrame::SourceCitation {
                message_id,
                sources,
            } => {
                self.transcript.apply_sources(&message_id, sources);
            }
            ServerFrame::Pong => {
                debug!("Pong received");
                return;
            }
        }
        self.publish();
    }

    /// React to the channel closing, however it closed
    fn handle_closure(&mut self, code: Option<u16>) {
        self.socket = None;
        self.teardown_connection();

        match classify_close(code) {
            CloseKind::Clean => {
                info!("Channel closed cleanly");
                self.status = ConnectionStatus::Disconnected;
            }
            CloseKind::AuthRejected => {
                warn!("Channel closed: authentication rejected");
                self.status = ConnectionStatus::Error;
                self.last_error = Some(ClientError::AuthRejected.to_string());
            }
            CloseKind::Retryable => {
                self.status = ConnectionStatus::Disconnected;
                self.schedule_retry();
            }
        }
        self.publish();
    }

    /// Per-closure cleanup shared by every close path
    ///
    /// In-flight streams are abandoned, not silently completed.
    fn teardown_connection(&mut self) {
        self.heartbeat = None;
        self.session_id = None;
        self.transcript.abandon_streams();
        self.typing.clear_local();
    }

    /// Serialize and send one frame; a send failure counts as a closure
    async fn send_frame(&mut self, frame: &ClientFrame) -> bool {
        let Some(socket) = self.socket.as_mut() else {
            return false;
        };
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize frame: {}", e);
                return false;
            }
        };
        match socket.send(Message::Text(json.into())).await {
            Ok(()) => true,
            Err(e) => {
                warn!("WebSocket send failed: {}", e);
                self.handle_closure(None);
                false
            }
        }
    }

    fn start_heartbeat(&mut self) {
        let period = self.config.heartbeat_interval;
        self.heartbeat = Some(time::interval_at(Instant::now() + period, period));
    }

    /// Ask the backoff policy for a retry slot and arm the timer
    fn schedule_retry(&mut self) {
        match self.reconnect.next_delay() {
            Some(delay) => {
                info!(
                    "Reconnect attempt {} in {:?}",
                    self.reconnect.attempts(),
                    delay
                );
                self.reconnect_at = Some(Instant::now() + delay);
            }
            None => {
                warn!("Reconnect attempts exhausted");
                self.last_error =
                    Some("Connection lost; automatic reconnect attempts exhausted".to_string());
            }
        }
    }

    /// Push a fresh state snapshot to all observers
    fn publish(&self) {
        self.state_tx.send_replace(ChatState {
            status: self.status,
            session_id: self.session_id.clone(),
            messages: self.transcript.messages().to_vec(),
            is_typing: self.typing.is_typing(),
            remote_typing: self.remote_typing,
            last_error: self.last_error.clone(),
        });
    }
}

/// Next inbound socket event; pends forever while no socket is open
async fn next_socket_event(socket: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
    match socket {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Next heartbeat tick; pends forever while the monitor is stopped
async fn heartbeat_tick(interval: &mut Option<time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Sleep until an optional deadline; pends forever when none is armed
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
