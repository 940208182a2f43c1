//! Broadcast and owner registry tests

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkrelay::access::Requester;
use linkrelay::config::{AccessConfig, DatabaseConfig};
use linkrelay::errors::LinkRelayError;
use linkrelay::services::BroadcastService;
use linkrelay::storage::OwnerProfile;
use linkrelay::storage::backend::SeaOrmStorage;
use linkrelay::transport::{ChatId, MessageRef, ProgressFn, Transport, TransportError};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Delivers text to everyone except `unreachable`; `busy` is rate limited once
struct InboxTransport {
    unreachable: HashSet<i64>,
    busy: Mutex<HashSet<i64>>,
    delivered: Mutex<Vec<(i64, String)>>,
}

impl InboxTransport {
    fn new(unreachable: &[i64], busy: &[i64]) -> Self {
        Self {
            unreachable: unreachable.iter().copied().collect(),
            busy: Mutex::new(busy.iter().copied().collect()),
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn recipients(&self) -> Vec<i64> {
        self.delivered.lock().iter().map(|(chat, _)| *chat).collect()
    }
}

#[async_trait]
impl Transport for InboxTransport {
    async fn send_text(&self, destination: ChatId, text: &str) -> Result<MessageRef, TransportError> {
        if self.unreachable.contains(&destination.0) {
            return Err(TransportError::failed("bot was blocked by the user"));
        }
        if self.busy.lock().remove(&destination.0) {
            return Err(TransportError::RateLimited {
                retry_after: Duration::from_millis(10),
            });
        }
        let mut delivered = self.delivered.lock();
        delivered.push((destination.0, text.to_string()));
        Ok(MessageRef::new(destination.0, delivered.len() as i64))
    }

    async fn send_document(
        &self,
        _destination: ChatId,
        _path: &Path,
        _caption: Option<&str>,
        _progress: ProgressFn<'_>,
    ) -> Result<MessageRef, TransportError> {
        Err(TransportError::failed("documents are not used here"))
    }

    async fn download_media(
        &self,
        _message: MessageRef,
        _target: &Path,
        _progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError> {
        Err(TransportError::failed("downloads are not used here"))
    }

    async fn forward(
        &self,
        _destination: ChatId,
        _source: MessageRef,
    ) -> Result<MessageRef, TransportError> {
        Err(TransportError::failed("forwards are not used here"))
    }
}

async fn create_test_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("owners.db").display());
    let storage = SeaOrmStorage::new(&db_url, "sqlite", &DatabaseConfig::default())
        .await
        .expect("Failed to create storage");
    (Arc::new(storage), temp_dir)
}

async fn register(storage: &SeaOrmStorage, ids: &[i64]) {
    for id in ids {
        storage.register_owner(&OwnerProfile::new(*id)).await.unwrap();
    }
}

#[tokio::test]
async fn test_broadcast_reaches_active_owners_and_counts_failures() {
    let (storage, _temp) = create_test_storage().await;
    register(&storage, &[1, 2, 3, 4, 5]).await;
    storage.set_blocked(4, true).await.unwrap();

    let transport = Arc::new(InboxTransport::new(&[5], &[2]));
    let service = BroadcastService::new(storage.clone(), transport.clone());

    let access = AccessConfig {
        operator_ids: vec![1],
    };
    let report = service
        .broadcast("maintenance at 02:00", &access.requester(1))
        .await
        .unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.sent, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(transport.recipients(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_broadcast_requires_an_operator() {
    let (storage, _temp) = create_test_storage().await;
    register(&storage, &[1, 2]).await;

    let transport = Arc::new(InboxTransport::new(&[], &[]));
    let service = BroadcastService::new(storage, transport.clone());

    let err = service
        .broadcast("hello", &Requester::user(2))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkRelayError::PermissionDenied(_)));

    let err = service
        .broadcast("   ", &Requester::operator(1))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkRelayError::Validation(_)));

    assert!(transport.recipients().is_empty());
}

#[tokio::test]
async fn test_register_owner_updates_profile_but_keeps_counters() {
    let (storage, _temp) = create_test_storage().await;

    let owner = storage
        .register_owner(&OwnerProfile {
            id: 9,
            display_name: Some("Ada".to_string()),
            handle: None,
        })
        .await
        .unwrap();
    assert_eq!(owner.display_name.as_deref(), Some("Ada"));
    assert!(!owner.is_blocked);

    storage.set_blocked(9, true).await.unwrap();
    storage.insert_link(9, "keep01", "https://example.com", None).await.unwrap();

    let owner = storage
        .register_owner(&OwnerProfile {
            id: 9,
            display_name: Some("Ada L.".to_string()),
            handle: Some("ada".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(owner.display_name.as_deref(), Some("Ada L."));
    assert_eq!(owner.handle.as_deref(), Some("ada"));
    assert!(owner.is_blocked);
    assert_eq!(owner.links_count, 1);
}

#[tokio::test]
async fn test_block_unknown_owner_is_not_found() {
    let (storage, _temp) = create_test_storage().await;

    let err = storage.set_blocked(404, true).await.unwrap_err();
    assert!(matches!(err, LinkRelayError::NotFound(_)));
}
