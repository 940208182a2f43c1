use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::access::Requester;
use crate::config::{AccessConfig, StaticConfig};
use crate::services::{BroadcastService, FileCatalog, FileService, LinkService, TransferEngine};
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::transport::{LocalTransport, Transport};

/// Everything a command needs, built once per process
pub struct AppContext {
    pub storage: Arc<SeaOrmStorage>,
    pub transport: Arc<LocalTransport>,
    pub link_service: LinkService,
    pub file_service: FileService,
    pub transfer_engine: TransferEngine,
    pub broadcast_service: BroadcastService,
    pub access: AccessConfig,
}

impl AppContext {
    pub fn requester(&self, id: i64) -> Requester {
        self.access.requester(id)
    }
}

/// 准备运行上下文：存储、本地传输与各服务
pub async fn prepare_startup(config: &StaticConfig) -> Result<AppContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let transport = Arc::new(
        LocalTransport::open(&config.transport.root)
            .await
            .with_context(|| format!("Failed to open transport root '{}'", config.transport.root))?,
    );
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let catalog: Arc<dyn FileCatalog> = storage.clone();

    let context = AppContext {
        link_service: LinkService::new(storage.clone(), &config.shortener),
        file_service: FileService::new(storage.clone(), dyn_transport.clone()),
        transfer_engine: TransferEngine::new(dyn_transport.clone(), catalog, &config.transfer),
        broadcast_service: BroadcastService::new(storage.clone(), dyn_transport),
        access: config.access.clone(),
        storage,
        transport,
    };

    debug!(
        "Pre-startup processing completed in {:.2}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(context)
}
