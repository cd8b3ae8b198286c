pub mod sync_service;
pub mod scheduler;

pub use sync_service::CourseSyncService;
pub use scheduler::{SyncRunStats, SyncScheduler};
