//! Terminal Chat Client - Entry Point
//!
//! Connects to a conversation and bridges stdin/stdout to the session:
//! typed lines become chat messages, finalized assistant replies and
//! status transitions are printed as they arrive.

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_client::{
    ChatEvent, ChatSession, ClientConfig, ConnectionStatus, ConversationId, EnrichmentLevel,
};

/// Default backend address
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_client=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_client=info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let conversation = ConversationId::new(args.next().unwrap_or_else(|| "default".to_string()));
    let credential = args
        .next()
        .or_else(|| env::var("CHAT_TOKEN").ok())
        .unwrap_or_default();

    info!("Connecting to {} (conversation {})", base_url, conversation);

    let config = ClientConfig::new(base_url);
    let (handle, mut events) = ChatSession::spawn(config, conversation, credential);
    let mut state = handle.watch();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_status = ConnectionStatus::Disconnected;

    println!("Type a message and press enter. /clear empties the transcript, /quit exits.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                match line.trim() {
                    "" => {}
                    "/quit" => {
                        handle.disconnect().await?;
                        break;
                    }
                    "/clear" => handle.clear_messages().await?,
                    text => handle.send_message(text, EnrichmentLevel::Standard).await?,
                }
            }
            event = events.recv() => {
                let Some(ChatEvent::MessageCommitted(message)) = event else { break };
                println!("assistant> {}", message.content);
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                if snapshot.status != last_status {
                    println!("[{}]", snapshot.status);
                    last_status = snapshot.status;
                }
                if let Some(error) = &snapshot.last_error {
                    if snapshot.status == ConnectionStatus::Error {
                        eprintln!("error: {}", error);
                    }
                }
            }
        }
    }

    info!("Goodbye");
    Ok(())
}
