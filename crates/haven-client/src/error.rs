use thiserror::Error;

use haven_types::{ChannelId, MessageId};

/// Errors surfaced to the consumer of a channel session.
///
/// Any of these means the operation did not touch the thread store.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not permitted in channel {channel_id}: {action}")]
    Forbidden {
        channel_id: ChannelId,
        action: &'static str,
    },

    #[error("Unknown message {0}")]
    UnknownMessage(MessageId),

    #[error("Gateway connection closed")]
    GatewayClosed,

    #[error("Channel session was closed")]
    SessionClosed,
}

impl ClientError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::GatewayClosed => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
