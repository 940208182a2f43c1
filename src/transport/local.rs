//! Filesystem-backed transport
//!
//! Each chat is a directory under the root and each message a file named by
//! its id: `<id>.bin` for media, `<id>.txt` for text and captions. Used by the
//! CLI and for local development where no chat platform is reachable.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::{ChatId, MessageId, MessageRef, ProgressFn, Transport, TransportError};

/// Copy granularity; progress is reported once per chunk
const CHUNK_SIZE: usize = 1024 * 1024;

/// Media that arrived in a chat and can be handed to the transfer engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMedia {
    pub message: MessageRef,
    /// Opaque platform identifier of the payload
    pub file_ref: String,
    pub file_name: Option<String>,
    /// Size announced by the platform before any byte is fetched
    pub declared_size: u64,
}

pub struct LocalTransport {
    root: PathBuf,
    next_id: AtomicI64,
}

impl LocalTransport {
    /// Open (or create) a transport root, continuing message ids after the highest one on disk
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        let mut max_id = 0i64;
        let mut chats = fs::read_dir(&root).await?;
        while let Some(chat) = chats.next_entry().await? {
            if !chat.file_type().await?.is_dir() {
                continue;
            }
            let mut messages = fs::read_dir(chat.path()).await?;
            while let Some(entry) = messages.next_entry().await? {
                let name = entry.file_name();
                let id = name
                    .to_str()
                    .and_then(|n| n.split('.').next())
                    .and_then(|n| n.parse::<i64>().ok());
                if let Some(id) = id {
                    max_id = max_id.max(id);
                }
            }
        }

        Ok(Self {
            root,
            next_id: AtomicI64::new(max_id + 1),
        })
    }

    fn chat_dir(&self, chat: ChatId) -> PathBuf {
        self.root.join(chat.0.to_string())
    }

    fn media_path(&self, message: MessageRef) -> PathBuf {
        self.chat_dir(message.chat)
            .join(format!("{}.bin", message.message.0))
    }

    fn text_path(&self, message: MessageRef) -> PathBuf {
        self.chat_dir(message.chat)
            .join(format!("{}.txt", message.message.0))
    }

    async fn allocate(&self, chat: ChatId) -> Result<MessageRef, TransportError> {
        fs::create_dir_all(self.chat_dir(chat)).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MessageRef {
            chat,
            message: MessageId(id),
        })
    }

    /// Simulate a user posting a file into `chat`
    pub async fn post_media(
        &self,
        chat: ChatId,
        source: &Path,
    ) -> Result<IncomingMedia, TransportError> {
        let message = self.allocate(chat).await?;
        let declared_size = copy_with_progress(source, &self.media_path(message), &|_, _| {}).await?;
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);

        Ok(IncomingMedia {
            message,
            file_ref: uuid::Uuid::new_v4().simple().to_string(),
            file_name,
            declared_size,
        })
    }

    /// Read back a text message (or caption)
    pub async fn read_text(&self, message: MessageRef) -> Result<String, TransportError> {
        Ok(fs::read_to_string(self.text_path(message)).await?)
    }

    pub async fn has_media(&self, message: MessageRef) -> bool {
        fs::try_exists(self.media_path(message))
            .await
            .unwrap_or(false)
    }
}

async fn copy_with_progress(
    source: &Path,
    target: &Path,
    progress: ProgressFn<'_>,
) -> Result<u64, TransportError> {
    let mut reader = fs::File::open(source).await?;
    let total = reader.metadata().await?.len();

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut writer = fs::File::create(target).await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        written += n as u64;
        progress(written, total);
    }
    writer.flush().await?;

    Ok(written)
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send_text(&self, destination: ChatId, text: &str) -> Result<MessageRef, TransportError> {
        let message = self.allocate(destination).await?;
        fs::write(self.text_path(message), text).await?;
        debug!("LocalTransport: text -> {}", message);
        Ok(message)
    }

    async fn send_document(
        &self,
        destination: ChatId,
        path: &Path,
        caption: Option<&str>,
        progress: ProgressFn<'_>,
    ) -> Result<MessageRef, TransportError> {
        let message = self.allocate(destination).await?;
        copy_with_progress(path, &self.media_path(message), progress).await?;
        if let Some(caption) = caption {
            fs::write(self.text_path(message), caption).await?;
        }
        debug!("LocalTransport: document {} -> {}", path.display(), message);
        Ok(message)
    }

    async fn download_media(
        &self,
        message: MessageRef,
        target: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError> {
        let source = self.media_path(message);
        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(TransportError::NotFound(format!("no media in message {}", message)));
        }
        copy_with_progress(&source, target, progress).await
    }

    async fn forward(
        &self,
        destination: ChatId,
        source: MessageRef,
    ) -> Result<MessageRef, TransportError> {
        let media = self.media_path(source);
        let text = self.text_path(source);
        let has_media = fs::try_exists(&media).await.unwrap_or(false);
        let has_text = fs::try_exists(&text).await.unwrap_or(false);
        if !has_media && !has_text {
            return Err(TransportError::NotFound(format!("message {} does not exist", source)));
        }

        let forwarded = self.allocate(destination).await?;
        if has_media {
            fs::copy(&media, self.media_path(forwarded)).await?;
        }
        if has_text {
            fs::copy(&text, self.text_path(forwarded)).await?;
        }
        debug!("LocalTransport: forwarded {} -> {}", source, forwarded);
        Ok(forwarded)
    }
}
