//! Code allocator tests against a real registry

use std::collections::HashSet;
use std::sync::Arc;

use linkrelay::config::{DatabaseConfig, ShortenerConfig};
use linkrelay::services::{CodeAllocator, CodeRegistry, LinkService};
use linkrelay::storage::backend::SeaOrmStorage;
use tempfile::TempDir;

async fn create_test_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("codes.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite", &DatabaseConfig::default())
        .await
        .expect("Failed to create storage");
    (Arc::new(storage), temp_dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shortens_never_share_a_code() {
    const REQUESTS: usize = 50;

    let (storage, _temp) = create_test_storage().await;
    let service = Arc::new(LinkService::new(storage.clone(), &ShortenerConfig::default()));

    let mut handles = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .shorten((i % 5) as i64, &format!("https://example.com/{}", i))
                .await
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(codes.insert(result.link.code.clone()), "duplicate code {}", result.link.code);
    }
    assert_eq!(codes.len(), REQUESTS);

    let stats = storage.stats().await.unwrap();
    assert_eq!(stats.links, REQUESTS as u64);
    assert_eq!(stats.owners, 5);
}

#[tokio::test]
async fn test_allocated_codes_are_free_in_the_registry() {
    let (storage, _temp) = create_test_storage().await;
    let registry: Arc<dyn CodeRegistry> = storage.clone();
    let allocator = CodeAllocator::new(registry, &ShortenerConfig::default());

    for length in [6, 8, 12] {
        let code = allocator.allocate(length).await.unwrap();
        assert_eq!(code.len(), length);
        assert!(!storage.code_exists(&code).await.unwrap());
    }

    assert!(allocator.allocate(5).await.is_err());
}
