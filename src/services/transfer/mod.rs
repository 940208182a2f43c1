//! Transfer engine
//!
//! Moves file payloads between the chat platform and local storage. Each
//! transfer is one sequential unit of work; many can run side by side. The
//! size ceiling is checked before the transport is touched, rate limits are
//! waited out and the whole call re-issued, and the catalog row is written
//! only after the bytes are safely on disk.

mod progress;
mod recovery;
mod state;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::fs;
use tokio::sync::Notify;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

pub use progress::{NoopObserver, ProgressEvent, ProgressObserver, ProgressTracker};
pub use recovery::retry_rate_limited;
pub use state::{TransferDirection, TransferSnapshot, TransferState};

use crate::config::TransferConfig;
use crate::errors::{LinkRelayError, Result};
use crate::storage::{FileRecord, MediaType, NewFileRecord};
use crate::transport::{ChatId, IncomingMedia, MessageRef, ProgressFn, Transport, TransportError};
use crate::utils::{format_file_size, sanitize_filename};

/// Where the engine records completed inbound transfers
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// Insert the record and bump the owner's file counter in one unit
    async fn insert_file(&self, record: &NewFileRecord) -> Result<FileRecord>;

    async fn attach_mirror(&self, file_ref: &str, mirror: MessageRef) -> Result<()>;
}

/// Outcome of a successful inbound transfer
#[derive(Debug, Clone)]
pub struct CompletedTransfer {
    pub record: FileRecord,
    pub local_path: PathBuf,
    /// Number of times the download was issued (rate limits included)
    pub attempts: u32,
}

pub struct TransferEngine {
    transport: Arc<dyn Transport>,
    catalog: Arc<dyn FileCatalog>,
    config: TransferConfig,
    active: DashMap<Uuid, TransferSnapshot>,
}

impl TransferEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        catalog: Arc<dyn FileCatalog>,
        config: &TransferConfig,
    ) -> Self {
        Self {
            transport,
            catalog,
            config: config.clone(),
            active: DashMap::new(),
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Transfers that have not reached a terminal state yet, oldest first
    pub fn active_transfers(&self) -> Vec<TransferSnapshot> {
        let mut snapshots: Vec<TransferSnapshot> =
            self.active.iter().map(|entry| entry.value().clone()).collect();
        snapshots.sort_by_key(|s| s.started_at);
        snapshots
    }

    /// Download `media` from the chat, store it locally and catalog it for `owner_id`
    pub async fn ingest(
        &self,
        owner_id: i64,
        media: &IncomingMedia,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<CompletedTransfer> {
        let name = media
            .file_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("file_{}", media.message.message.0));
        let id = self.begin(TransferDirection::Inbound, &name, media.declared_size);
        info!(
            "Transfer {}: ingest '{}' ({}) from {} for owner {}",
            id,
            name,
            format_file_size(media.declared_size),
            media.message,
            owner_id
        );

        if let Err(e) = self.check_size(media.declared_size) {
            return Err(self.fail(id, e));
        }
        self.transition(id, TransferState::SizeChecked);

        let temp_path = self.temp_path(id);
        let local_path = self.local_path(id, owner_id, &name);
        if let Err(e) = self.prepare_dirs().await {
            return Err(self.fail(id, e));
        }

        let tracker = ProgressTracker::new(
            id,
            self.config.progress_step_percent,
            Duration::from_secs(self.config.throughput_window_secs),
            observer,
        );
        // 声明大小可能偏小：流式写入一旦越过上限就中止下载
        let oversized = AtomicBool::new(false);
        let size_guard = Notify::new();
        let on_progress = |done: u64, total: u64| {
            if done > self.config.max_file_size && !oversized.swap(true, Ordering::SeqCst) {
                size_guard.notify_one();
            }
            tracker.update(done, total);
            self.record_bytes(id, done, total);
        };
        let progress: ProgressFn<'_> = &on_progress;
        let target = temp_path.as_path();
        let attempts = AtomicU32::new(0);

        let downloaded = retry_rate_limited(&format!("transfer {}", id), |attempt| {
            attempts.store(attempt, Ordering::SeqCst);
            if attempt > 1 {
                tracker.reset();
            }
            self.transition(id, TransferState::InFlight { attempt });
            let call = self.bounded(self.transport.download_media(media.message, target, progress));
            let guard = &size_guard;
            async move {
                tokio::select! {
                    outcome = call => outcome,
                    _ = guard.notified() => {
                        Err(TransportError::failed("download aborted at the size limit"))
                    }
                }
            }
        })
        .await;

        if oversized.load(Ordering::SeqCst) {
            remove_quietly(&temp_path).await;
            let err = LinkRelayError::size_limit_exceeded(format!(
                "payload grew past the {} limit while streaming",
                format_file_size(self.config.max_file_size)
            ));
            return Err(self.fail(id, err));
        }

        let bytes = match downloaded {
            Ok(bytes) => bytes,
            Err(e) => {
                remove_quietly(&temp_path).await;
                return Err(self.fail(id, e.into()));
            }
        };

        // 实际大小以写入的字节为准，超限的文件不入库
        if bytes == 0 {
            remove_quietly(&temp_path).await;
            return Err(self.fail(id, LinkRelayError::validation("downloaded file is empty")));
        }
        if let Err(e) = self.check_size(bytes) {
            remove_quietly(&temp_path).await;
            return Err(self.fail(id, e));
        }
        if let Err(e) = move_file(&temp_path, &local_path).await {
            remove_quietly(&temp_path).await;
            return Err(self.fail(id, e));
        }

        let new_record = NewFileRecord {
            file_ref: media.file_ref.clone(),
            owner_id,
            media_type: MediaType::from_file_name(&name),
            name,
            size_bytes: bytes,
            source: media.message,
        };
        // local_path 按传输 id 唯一，失败时只删除本次写入的文件
        let mut record = match self.catalog.insert_file(&new_record).await {
            Ok(record) => record,
            Err(e) => {
                remove_quietly(&local_path).await;
                return Err(self.fail(id, e));
            }
        };

        if let Some(mirror) = self.mirror(&record).await {
            record.mirror = Some(mirror);
        }

        self.finish(id, TransferState::Completed);
        let attempts = attempts.load(Ordering::SeqCst);
        info!(
            "Transfer {}: completed '{}' ({}) after {} attempt(s)",
            id,
            record.name,
            format_file_size(record.size_bytes),
            attempts
        );

        Ok(CompletedTransfer {
            record,
            local_path,
            attempts,
        })
    }

    /// Send a local file into `destination`; nothing is cataloged
    pub async fn upload(
        &self,
        destination: ChatId,
        path: &Path,
        caption: Option<&str>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<MessageRef> {
        let metadata = fs::metadata(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                LinkRelayError::not_found(format!("文件不存在: {}", path.display()))
            }
            _ => LinkRelayError::from(e),
        })?;
        let size = metadata.len();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let id = self.begin(TransferDirection::Outbound, &name, size);
        info!("Transfer {}: upload '{}' ({}) to {}", id, name, format_file_size(size), destination);

        if size == 0 {
            return Err(self.fail(id, LinkRelayError::validation("cannot send an empty file")));
        }
        if let Err(e) = self.check_size(size) {
            return Err(self.fail(id, e));
        }
        self.transition(id, TransferState::SizeChecked);

        let tracker = ProgressTracker::new(
            id,
            self.config.progress_step_percent,
            Duration::from_secs(self.config.throughput_window_secs),
            observer,
        );
        let on_progress = |done: u64, total: u64| {
            tracker.update(done, total);
            self.record_bytes(id, done, total);
        };
        let progress: ProgressFn<'_> = &on_progress;

        let sent = retry_rate_limited(&format!("transfer {}", id), |attempt| {
            if attempt > 1 {
                tracker.reset();
            }
            self.transition(id, TransferState::InFlight { attempt });
            self.bounded(self.transport.send_document(destination, path, caption, progress))
        })
        .await;

        match sent {
            Ok(message) => {
                self.finish(id, TransferState::Completed);
                info!("Transfer {}: uploaded '{}' as {}", id, name, message);
                Ok(message)
            }
            Err(e) => Err(self.fail(id, e.into())),
        }
    }

    /// Delete temp files older than `temp_max_age_secs`, skipping active transfers
    pub async fn cleanup_stale_files(&self) -> Result<usize> {
        let temp_dir = Path::new(&self.config.temp_dir);
        let mut entries = match fs::read_dir(temp_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let max_age = Duration::from_secs(self.config.temp_max_age_secs);
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let in_use = entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .is_some_and(|id| self.active.contains_key(&id));
            if in_use {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age > max_age {
                fs::remove_file(entry.path()).await?;
                removed += 1;
                info!("Cleaned up temp file: {}", entry.path().display());
            }
        }

        Ok(removed)
    }

    /// Final location of an inbound file, never shared between two transfers
    fn local_path(&self, id: Uuid, owner_id: i64, name: &str) -> PathBuf {
        Path::new(&self.config.files_dir).join(format!(
            "{}_{}_{}",
            owner_id,
            id.simple(),
            sanitize_filename(name)
        ))
    }

    fn temp_path(&self, id: Uuid) -> PathBuf {
        Path::new(&self.config.temp_dir).join(format!("{}.part", id.simple()))
    }

    async fn prepare_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.config.temp_dir).await?;
        fs::create_dir_all(&self.config.files_dir).await?;
        Ok(())
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.config.max_file_size {
            return Err(LinkRelayError::size_limit_exceeded(format!(
                "{} exceeds the {} limit",
                format_file_size(size),
                format_file_size(self.config.max_file_size)
            )));
        }
        Ok(())
    }

    /// Apply the optional per-attempt watchdog
    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, TransportError>>,
    ) -> std::result::Result<T, TransportError> {
        if self.config.stall_timeout_secs == 0 {
            return call.await;
        }
        let limit = Duration::from_secs(self.config.stall_timeout_secs);
        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(TransportError::failed(format!(
                "transfer stalled: no completion within {}s",
                limit.as_secs()
            )))
        })
    }

    /// One best-effort forward into the mirror channel; failures are only logged
    async fn mirror(&self, record: &FileRecord) -> Option<MessageRef> {
        let mirror_chat = ChatId(self.config.mirror_chat_id?);

        let mirrored = match self.transport.forward(mirror_chat, record.source).await {
            Ok(message) => message,
            Err(e) if e.is_rate_limited() => {
                warn!(
                    "Mirror of {} to {} skipped, channel is rate limited: {}",
                    record.file_ref, mirror_chat, e
                );
                return None;
            }
            Err(e) => {
                warn!("Mirror of {} to {} failed: {}", record.file_ref, mirror_chat, e);
                return None;
            }
        };
        if let Err(e) = self.catalog.attach_mirror(&record.file_ref, mirrored).await {
            warn!("Could not record mirror {} for {}: {}", mirrored, record.file_ref, e);
            return None;
        }

        debug!("Mirrored {} as {}", record.file_ref, mirrored);
        Some(mirrored)
    }

    fn begin(&self, direction: TransferDirection, name: &str, bytes_total: u64) -> Uuid {
        let id = Uuid::new_v4();
        self.active.insert(
            id,
            TransferSnapshot {
                id,
                direction,
                name: name.to_string(),
                state: TransferState::Requested,
                bytes_transferred: 0,
                bytes_total,
                started_at: Utc::now(),
            },
        );
        id
    }

    fn transition(&self, id: Uuid, next: TransferState) {
        if let Some(mut entry) = self.active.get_mut(&id) {
            if !entry.state.can_transition_to(&next) {
                warn!(
                    "Transfer {}: unexpected transition {:?} -> {:?}",
                    id, entry.state, next
                );
            }
            if matches!(next, TransferState::InFlight { .. }) {
                entry.bytes_transferred = 0;
            }
            trace!(
                "Transfer {}: {} -> {}",
                id,
                entry.state.label(),
                next.label()
            );
            entry.state = next;
        }
    }

    fn record_bytes(&self, id: Uuid, done: u64, total: u64) {
        if let Some(mut entry) = self.active.get_mut(&id) {
            entry.bytes_transferred = done;
            entry.bytes_total = total;
        }
    }

    /// Move to a terminal state and drop the transfer from the active set
    fn finish(&self, id: Uuid, terminal: TransferState) {
        self.transition(id, terminal);
        self.active.remove(&id);
    }

    fn fail(&self, id: Uuid, err: LinkRelayError) -> LinkRelayError {
        error!("Transfer {}: failed: {}", id, err);
        self.finish(
            id,
            TransferState::Failed {
                reason: err.to_string(),
            },
        );
        err
    }
}

async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // rename 不能跨文件系统，退回复制
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}
