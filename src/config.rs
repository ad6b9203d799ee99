//! Client configuration
//!
//! Tunable periods for the connection lifecycle plus endpoint construction.
//! All durations have production defaults; tests shrink them to keep
//! scenarios fast.

use std::time::Duration;

use crate::error::ClientError;
use crate::types::ConversationId;

/// Default keep-alive ping period
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default base delay between reconnect attempts (grows linearly)
const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default maximum automatic reconnect attempts
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default window after which local typing auto-stops
const DEFAULT_TYPING_AUTO_STOP: Duration = Duration::from_secs(3);

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `https://api.example.com` or `ws://127.0.0.1:8080`
    pub base_url: String,
    /// Period between keep-alive ping frames while connected
    pub heartbeat_interval: Duration,
    /// Base delay multiplied by the attempt number for reconnect backoff
    pub reconnect_base_delay: Duration,
    /// Maximum automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// How long after the last keystroke the typing indicator auto-stops
    pub typing_auto_stop: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            typing_auto_stop: DEFAULT_TYPING_AUTO_STOP,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given base URL with default periods
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Build the WebSocket endpoint for a conversation
    ///
    /// Maps the base scheme to its WebSocket counterpart (http → ws,
    /// https → wss) and appends `/ws/chat/<conversation>?token=<credential>`
    /// with the credential percent-encoded.
    pub fn endpoint(
        &self,
        conversation: &ConversationId,
        credential: &str,
    ) -> Result<String, ClientError> {
        let base = url::Url::parse(&self.base_url)?;

        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };

        let host = base
            .host_str()
            .ok_or_else(|| ClientError::UnsupportedScheme(self.base_url.clone()))?;

        let mut endpoint = format!("{}://{}", scheme, host);
        if let Some(port) = base.port() {
            endpoint.push_str(&format!(":{}", port));
        }
        endpoint.push_str(base.path().trim_end_matches('/'));
        endpoint.push_str(&format!(
            "/ws/chat/{}?token={}",
            conversation,
            urlencoding::encode(credential)
        ));

        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_plain_scheme() {
        let config = ClientConfig::new("http://127.0.0.1:8080");
        let url = config
            .endpoint(&ConversationId::new("conv-1"), "secret")
            .unwrap();
        assert_eq!(url, "ws://127.0.0.1:8080/ws/chat/conv-1?token=secret");
    }

    #[test]
    fn test_endpoint_secure_scheme() {
        let config = ClientConfig::new("https://api.example.com");
        let url = config
            .endpoint(&ConversationId::new("conv-1"), "secret")
            .unwrap();
        assert_eq!(url, "wss://api.example.com/ws/chat/conv-1?token=secret");
    }

    #[test]
    fn test_endpoint_encodes_credential() {
        let config = ClientConfig::new("ws://localhost:9000");
        let url = config
            .endpoint(&ConversationId::new("c"), "a token+/=")
            .unwrap();
        assert_eq!(url, "ws://localhost:9000/ws/chat/c?token=a%20token%2B%2F%3D");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ClientConfig::new("https://api.example.com/v2/");
        let url = config
            .endpoint(&ConversationId::new("c"), "t")
            .unwrap();
        assert_eq!(url, "wss://api.example.com/v2/ws/chat/c?token=t");
    }

    #[test]
    fn test_endpoint_rejects_unknown_scheme() {
        let config = ClientConfig::new("ftp://example.com");
        let err = config.endpoint(&ConversationId::new("c"), "t");
        assert!(matches!(err, Err(ClientError::UnsupportedScheme(_))));
    }
}
