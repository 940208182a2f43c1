//! File relay tests
//!
//! Ingest through the filesystem transport into a temporary SQLite catalog,
//! then forward, deliver and delete.

use std::path::PathBuf;
use std::sync::Arc;

use linkrelay::access::Requester;
use linkrelay::config::{DatabaseConfig, ShortenerConfig, TransferConfig};
use linkrelay::errors::LinkRelayError;
use linkrelay::services::{
    CompletedTransfer, FileCatalog, FileService, LinkService, NoopObserver, TransferEngine,
};
use linkrelay::storage::MediaType;
use linkrelay::storage::backend::SeaOrmStorage;
use linkrelay::transport::{ChatId, LocalTransport, MessageRef, Transport};
use tempfile::TempDir;

// =============================================================================
// Test Setup
// =============================================================================

const MIRROR_CHAT: i64 = -500;

struct Relay {
    storage: Arc<SeaOrmStorage>,
    transport: Arc<LocalTransport>,
    engine: TransferEngine,
    files: FileService,
    dir: TempDir,
}

impl Relay {
    async fn new(mirror_chat_id: Option<i64>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("relay.db").display());
        let storage = Arc::new(
            SeaOrmStorage::new(&db_url, "sqlite", &DatabaseConfig::default())
                .await
                .expect("Failed to create storage"),
        );
        let transport = Arc::new(
            LocalTransport::open(dir.path().join("chats"))
                .await
                .expect("Failed to open transport"),
        );

        let config = TransferConfig {
            files_dir: dir.path().join("files").display().to_string(),
            temp_dir: dir.path().join("temp").display().to_string(),
            mirror_chat_id,
            ..TransferConfig::default()
        };
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let catalog: Arc<dyn FileCatalog> = storage.clone();

        Self {
            engine: TransferEngine::new(dyn_transport.clone(), catalog, &config),
            files: FileService::new(storage.clone(), dyn_transport),
            storage,
            transport,
            dir,
        }
    }

    /// User `owner` posts a file with `bytes` of content named `name` and the bot stores it
    async fn ingest(&self, owner: i64, name: &str, bytes: usize) -> CompletedTransfer {
        let source = self.write_source(name, bytes);
        let media = self.transport.post_media(ChatId(owner), &source).await.unwrap();
        self.engine
            .ingest(owner, &media, Arc::new(NoopObserver))
            .await
            .unwrap()
    }

    fn write_source(&self, name: &str, bytes: usize) -> PathBuf {
        let outbox = self.dir.path().join("outbox");
        std::fs::create_dir_all(&outbox).unwrap();
        let path = outbox.join(name);
        std::fs::write(&path, vec![b'x'; bytes]).unwrap();
        path
    }

    fn message_file(&self, message: MessageRef) -> PathBuf {
        self.dir
            .path()
            .join("chats")
            .join(message.chat.0.to_string())
            .join(format!("{}.bin", message.message.0))
    }
}

// =============================================================================
// Ingest into the catalog
// =============================================================================

#[cfg(test)]
mod ingest_tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_catalogs_file_and_counts_it() {
        let relay = Relay::new(None).await;

        let done = relay.ingest(10, "slides.pdf", 3000).await;

        let stored = relay.files.find(&done.record.file_ref).await.unwrap();
        assert_eq!(stored.id, done.record.id);
        assert_eq!(stored.owner_id, 10);
        assert_eq!(stored.name, "slides.pdf");
        assert_eq!(stored.source, done.record.source);
        assert_eq!(stored.media_type, MediaType::Document);
        assert_eq!(stored.size_bytes, 3000);
        assert_eq!(std::fs::read(&done.local_path).unwrap().len(), 3000);

        let owner = relay.storage.get_owner(10).await.unwrap().unwrap();
        assert_eq!(owner.files_count, 1);
    }

    #[tokio::test]
    async fn test_ingest_with_mirror_channel() {
        let relay = Relay::new(Some(MIRROR_CHAT)).await;

        let done = relay.ingest(10, "song.mp3", 100).await;

        let mirror = done.record.mirror.expect("mirror should be attached");
        assert_eq!(mirror.chat, ChatId(MIRROR_CHAT));
        assert!(relay.transport.has_media(mirror).await);

        let stored = relay.files.find(&done.record.file_ref).await.unwrap();
        assert_eq!(stored.mirror, Some(mirror));
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite_each_other() {
        let relay = Relay::new(None).await;
        let outbox = relay.dir.path().join("outbox");
        for (folder, content) in [("a", "AAAAAAAA"), ("b", "BB")] {
            std::fs::create_dir_all(outbox.join(folder)).unwrap();
            std::fs::write(outbox.join(folder).join("photo.jpg"), content).unwrap();
        }

        let first_media = relay
            .transport
            .post_media(ChatId(42), &outbox.join("a").join("photo.jpg"))
            .await
            .unwrap();
        let second_media = relay
            .transport
            .post_media(ChatId(42), &outbox.join("b").join("photo.jpg"))
            .await
            .unwrap();

        let first = relay
            .engine
            .ingest(42, &first_media, Arc::new(NoopObserver))
            .await
            .unwrap();
        let second = relay
            .engine
            .ingest(42, &second_media, Arc::new(NoopObserver))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&first.local_path).unwrap(), b"AAAAAAAA");
        assert_eq!(first.record.size_bytes, 8);
        assert_eq!(std::fs::read(&second.local_path).unwrap(), b"BB");
        assert_eq!(second.record.size_bytes, 2);

        // 同一条消息重复入库被拒绝，已有的两份本地文件都不受影响
        let err = relay
            .engine
            .ingest(42, &second_media, Arc::new(NoopObserver))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::Validation(_)));
        assert_eq!(std::fs::read(&first.local_path).unwrap(), b"AAAAAAAA");
        assert_eq!(std::fs::read(&second.local_path).unwrap(), b"BB");

        let owner = relay.storage.get_owner(42).await.unwrap().unwrap();
        assert_eq!(owner.files_count, 2);
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let relay = Relay::new(None).await;

        relay.ingest(10, "a.txt", 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        relay.ingest(10, "b.txt", 2).await;
        relay.ingest(11, "c.txt", 3).await;

        let names: Vec<String> = relay
            .files
            .list_by_owner(10, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }
}

// =============================================================================
// Forward / deliver
// =============================================================================

#[cfg(test)]
mod relay_tests {
    use super::*;

    #[tokio::test]
    async fn test_owner_forwards_to_another_chat() {
        let relay = Relay::new(None).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;

        let forwarded = relay
            .files
            .forward(&done.record.file_ref, ChatId(20), &Requester::user(10))
            .await
            .unwrap();

        assert_eq!(forwarded.chat, ChatId(20));
        assert!(relay.transport.has_media(forwarded).await);
    }

    #[tokio::test]
    async fn test_stranger_may_not_forward_but_operator_may() {
        let relay = Relay::new(None).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;

        let err = relay
            .files
            .forward(&done.record.file_ref, ChatId(20), &Requester::user(11))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::PermissionDenied(_)));

        relay
            .files
            .forward(&done.record.file_ref, ChatId(20), &Requester::operator(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forward_prefers_the_mirror() {
        let relay = Relay::new(Some(MIRROR_CHAT)).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;

        // 原始消息被清掉后仍能从镜像转发
        std::fs::remove_file(relay.message_file(done.record.source)).unwrap();

        let forwarded = relay
            .files
            .forward(&done.record.file_ref, ChatId(20), &Requester::user(10))
            .await
            .unwrap();
        assert!(relay.transport.has_media(forwarded).await);
    }

    #[tokio::test]
    async fn test_forward_without_mirror_fails_when_source_is_gone() {
        let relay = Relay::new(None).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;
        std::fs::remove_file(relay.message_file(done.record.source)).unwrap();

        let err = relay
            .files
            .forward(&done.record.file_ref, ChatId(20), &Requester::user(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deliver_counts_downloads() {
        let relay = Relay::new(None).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;

        let first = relay
            .files
            .deliver(&done.record.file_ref, &Requester::user(10))
            .await
            .unwrap();
        relay
            .files
            .deliver(&done.record.file_ref, &Requester::user(10))
            .await
            .unwrap();

        assert_eq!(first.chat, ChatId(10));
        let stored = relay.files.find(&done.record.file_ref).await.unwrap();
        assert_eq!(stored.download_count, 2);
    }

    #[tokio::test]
    async fn test_denied_deliver_does_not_count() {
        let relay = Relay::new(None).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;

        let err = relay
            .files
            .deliver(&done.record.file_ref, &Requester::user(11))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::PermissionDenied(_)));

        let stored = relay.files.find(&done.record.file_ref).await.unwrap();
        assert_eq!(stored.download_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_file_is_not_found() {
        let relay = Relay::new(None).await;

        let err = relay
            .files
            .deliver("no-such-ref", &Requester::user(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::NotFound(_)));
    }
}

// =============================================================================
// Delete and statistics
// =============================================================================

#[cfg(test)]
mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_file_updates_counter() {
        let relay = Relay::new(None).await;
        let done = relay.ingest(10, "clip.mp4", 256).await;

        let err = relay
            .files
            .delete(&done.record.file_ref, &Requester::user(11))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::PermissionDenied(_)));

        let deleted = relay
            .files
            .delete(&done.record.file_ref, &Requester::user(10))
            .await
            .unwrap();
        assert_eq!(deleted.file_ref, done.record.file_ref);

        let err = relay.files.find(&done.record.file_ref).await.unwrap_err();
        assert!(matches!(err, LinkRelayError::NotFound(_)));
        let owner = relay.storage.get_owner(10).await.unwrap().unwrap();
        assert_eq!(owner.files_count, 0);

        let err = relay
            .files
            .delete(&done.record.file_ref, &Requester::user(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkRelayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stats_cover_links_and_files() {
        let relay = Relay::new(None).await;
        let links = LinkService::new(relay.storage.clone(), &ShortenerConfig::default());

        relay.ingest(10, "a.bin", 1000).await;
        relay.ingest(11, "b.bin", 24).await;
        let code = links.shorten(12, "example.org").await.unwrap().link.code;
        links.resolve(&code).await.unwrap();
        links.resolve(&code).await.unwrap();

        let stats = relay.storage.stats().await.unwrap();
        assert_eq!(stats.owners, 3);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.stored_bytes, 1024);
        assert_eq!(stats.links, 1);
        assert_eq!(stats.clicks, 2);
    }
}
