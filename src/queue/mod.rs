pub mod executor;
pub mod manager;
pub mod models;

pub use executor::{CatalogResolver, DirectUrlResolver, ProgressReporter, QueueExecutor, ResolvedFile, TransferExecutor};
pub use manager::QueueManager;
pub use models::{ContentKind, QueueItem, QueueItemRequest, QueueStatus, RunMode, RunSummary};
