//! Messaging transport boundary
//!
//! The chat platform is consumed through the [`Transport`] trait only. Every
//! primitive may answer with [`TransportError::RateLimited`], which carries the
//! wait the platform demands before the call may be issued again.

mod local;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use local::{IncomingMedia, LocalTransport};

/// Chat / channel identifier on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Message identifier, scoped to a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// A message the transport has stored somewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message: MessageId,
}

impl MessageRef {
    pub fn new(chat: i64, message: i64) -> Self {
        Self {
            chat: ChatId(chat),
            message: MessageId(message),
        }
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.chat.0, self.message.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The platform refused the call; it may be re-issued after `retry_after`
    RateLimited { retry_after: Duration },
    /// The referenced chat or message does not exist (any more)
    NotFound(String),
    Failed(String),
}

impl TransportError {
    pub fn failed<T: Into<String>>(msg: T) -> Self {
        TransportError::Failed(msg.into())
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited { .. })
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::RateLimited { retry_after } => {
                write!(f, "rate limited, retry after {}s", retry_after.as_secs_f64())
            }
            TransportError::NotFound(msg) => write!(f, "not found: {}", msg),
            TransportError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => TransportError::NotFound(err.to_string()),
            _ => TransportError::Failed(err.to_string()),
        }
    }
}

/// Byte-level progress callback: `(bytes_transferred, bytes_total)`
pub type ProgressFn<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Chat platform client
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, destination: ChatId, text: &str) -> Result<MessageRef, TransportError>;

    async fn send_document(
        &self,
        destination: ChatId,
        path: &Path,
        caption: Option<&str>,
        progress: ProgressFn<'_>,
    ) -> Result<MessageRef, TransportError>;

    /// Stream the media of `message` into `target`, returning the bytes written
    async fn download_media(
        &self,
        message: MessageRef,
        target: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError>;

    async fn forward(
        &self,
        destination: ChatId,
        source: MessageRef,
    ) -> Result<MessageRef, TransportError>;
}
