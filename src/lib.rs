//! Realtime Chat Transport Client Library
//!
//! A WebSocket chat client built with tokio-tungstenite using the Actor
//! pattern for state management. It streams incrementally-generated
//! assistant replies token-by-token, synchronizes typing indicators, keeps
//! the connection alive, and recovers transparently from transient network
//! failures - while never resurrecting a session the server rejected for
//! authentication reasons.
//!
//! # Features
//! - Authenticated WebSocket connection per conversation
//! - Token-by-token streaming reply assembly
//! - Optimistic local user messages
//! - Typing indicators with auto-stop debouncing
//! - Keep-alive heartbeat
//! - Linear-backoff reconnection with terminal auth-failure detection
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc`/`watch` channels:
//! - `ChatSession` is the actor owning the socket, transcript and timers
//! - `ChatHandle` is the caller's action API
//! - State is observed through cloneable `ChatState` snapshots
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use chat_client::{ChatSession, ClientConfig, ConversationId, EnrichmentLevel};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::new("https://api.example.com");
//!     let (handle, mut events) =
//!         ChatSession::spawn(config, ConversationId::new("conv-1"), "token");
//!
//!     handle.send_message("hello", EnrichmentLevel::Standard).await.unwrap();
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod message;
pub mod reconnect;
pub mod session;
pub mod transcript;
pub mod types;
pub mod typing;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{ClientError, SendError};
pub use handle::{ChatEvent, ChatHandle, ChatState};
pub use message::{ClientFrame, ServerFrame, Source};
pub use session::ChatSession;
pub use transcript::{ChatMessage, Transcript};
pub use types::{
    ConnectionStatus, ConversationId, EnrichmentLevel, MessageId, Role, SessionId,
};
