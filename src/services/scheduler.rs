use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::connectivity::Connectivity;
use crate::data_source::LocalDataSource;
use crate::error::AppError;
use crate::models::CourseId;
use crate::services::sync_service::CourseSyncService;

/// Outcome of one scheduled pass over the enabled courses.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncRunStats {
    pub synced: usize,
    pub failed: usize,
    pub skipped_offline: bool,
}

/// Periodically syncs every course whose sync settings are enabled.
/// A failed course is retried on the next tick.
pub struct SyncScheduler {
    service: Arc<CourseSyncService>,
    local: LocalDataSource,
    connectivity: Arc<dyn Connectivity>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(
        service: Arc<CourseSyncService>,
        local: LocalDataSource,
        connectivity: Arc<dyn Connectivity>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            local,
            connectivity,
            interval,
        }
    }

    /// Runs until `cancel` fires. The first pass happens after one interval.
    pub async fn start(self, cancel: CancelToken) {
        info!("Starting auto-sync scheduler (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            match self.run_sync(&cancel).await {
                Ok(stats) if stats.skipped_offline => debug!("Auto-sync skipped while offline"),
                Ok(stats) => info!(
                    "Auto-sync completed - synced: {}, failed: {}",
                    stats.synced, stats.failed
                ),
                Err(e) => warn!("Auto-sync failed: {}", e),
            }
        }

        info!("Auto-sync scheduler stopped");
    }

    pub async fn run_sync(&self, cancel: &CancelToken) -> Result<SyncRunStats, AppError> {
        if !self.connectivity.is_online() {
            return Ok(SyncRunStats {
                skipped_offline: true,
                ..SyncRunStats::default()
            });
        }

        let course_ids: Vec<CourseId> = self
            .local
            .enabled_sync_settings()
            .await?
            .into_iter()
            .map(|settings| settings.course_id)
            .collect();

        let results = self.service.sync_courses(&course_ids, cancel).await;
        let synced = results.iter().filter(|r| r.is_ok()).count();

        Ok(SyncRunStats {
            synced,
            failed: results.len() - synced,
            skipped_offline: false,
        })
    }
}
