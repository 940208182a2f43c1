//! Catalog queries and relays of stored files

use std::sync::Arc;

use tracing::info;

use super::transfer::retry_rate_limited;
use crate::access::Requester;
use crate::errors::{LinkRelayError, Result};
use crate::storage::{FileRecord, SeaOrmStorage};
use crate::transport::{ChatId, MessageRef, Transport};

/// Largest page `list_by_owner` returns
pub const MAX_FILE_LIST_LIMIT: u64 = 100;

pub struct FileService {
    storage: Arc<SeaOrmStorage>,
    transport: Arc<dyn Transport>,
}

impl FileService {
    pub fn new(storage: Arc<SeaOrmStorage>, transport: Arc<dyn Transport>) -> Self {
        Self { storage, transport }
    }

    /// Most recent files first; `limit` is clamped to 1..=100
    pub async fn list_by_owner(&self, owner_id: i64, limit: u64) -> Result<Vec<FileRecord>> {
        self.storage
            .list_files_by_owner(owner_id, limit.clamp(1, MAX_FILE_LIST_LIMIT))
            .await
    }

    pub async fn find(&self, file_ref: &str) -> Result<FileRecord> {
        self.storage
            .find_file(file_ref)
            .await?
            .ok_or_else(|| LinkRelayError::not_found(format!("文件不存在: {}", file_ref)))
    }

    /// Relay a stored file into `destination`
    ///
    /// Copies from the mirror when there is one, so the file survives the
    /// original chat being cleared.
    pub async fn forward(
        &self,
        file_ref: &str,
        destination: ChatId,
        requester: &Requester,
    ) -> Result<MessageRef> {
        let record = self.find(file_ref).await?;
        if !requester.may_manage(record.owner_id) {
            return Err(LinkRelayError::permission_denied(format!(
                "用户 {} 无权转发 {} 的文件 {}",
                requester.id, record.owner_id, file_ref
            )));
        }

        let source = record.relay_source();
        let forwarded = retry_rate_limited(&format!("forward {}", file_ref), |_| {
            self.transport.forward(destination, source)
        })
        .await?;

        info!("FileService: forwarded {} ({}) to {}", file_ref, source, destination);
        Ok(forwarded)
    }

    /// Forward the file into the requester's own chat and count a download
    pub async fn deliver(&self, file_ref: &str, requester: &Requester) -> Result<MessageRef> {
        let message = self
            .forward(file_ref, ChatId(requester.id), requester)
            .await?;
        self.storage.increment_download(file_ref).await?;
        Ok(message)
    }

    pub async fn delete(&self, file_ref: &str, requester: &Requester) -> Result<FileRecord> {
        self.storage.delete_file(file_ref, requester).await
    }
}
