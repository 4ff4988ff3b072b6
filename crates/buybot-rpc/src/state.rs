//! Connection state and transport selection.

use std::fmt;

/// Per-chain connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How swap logs are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// `eth_subscribe` over WebSocket.
    Streaming,
    /// `eth_getFilterChanges` polling over HTTP.
    Polling,
}

impl Transport {
    /// Streaming for `ws://` and `wss://` URLs, polling otherwise.
    pub fn for_url(url: &str) -> Self {
        let url = url.trim().to_ascii_lowercase();
        if url.starts_with("ws://") || url.starts_with("wss://") {
            Self::Streaming
        } else {
            Self::Polling
        }
    }
}
