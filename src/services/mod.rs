//! Service layer for business logic
//!
//! Each service receives its configuration section at construction time, so
//! several differently configured instances can live in one process.

mod broadcast;
mod code_allocator;
mod file_service;
mod link_service;
pub mod transfer;

pub use broadcast::{BroadcastReport, BroadcastService};
pub use code_allocator::{CodeAllocator, CodeRegistry, MIN_CODE_LENGTH};
pub use file_service::{FileService, MAX_FILE_LIST_LIMIT};
pub use link_service::{LinkService, MAX_LIST_LIMIT, ShortenResult};
pub use transfer::{
    CompletedTransfer, FileCatalog, NoopObserver, ProgressEvent, ProgressObserver,
    TransferDirection, TransferEngine, TransferSnapshot, TransferState,
};
