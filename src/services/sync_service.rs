use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::data_source::{CourseDataSource, LocalDataSource, NetworkDataSource};
use crate::error::{AppError, SyncError};
use crate::models::{
    CourseId, CourseSyncSettings, StageState, SyncProgress, SyncReport, SyncStage, SyncState,
};
use crate::session::{CleanupHandler, Session, SessionLease};

type CourseLocks = Arc<Mutex<HashMap<CourseId, Arc<tokio::sync::Mutex<()>>>>>;
type CourseStates = Arc<Mutex<HashMap<CourseId, watch::Sender<SyncState>>>>;

/// Pulls whole course graphs from the network into the local store.
///
/// Every nested collection is fetched before anything is written, and the write is a
/// single transaction, so a failed or cancelled run leaves the previous replica as it was.
/// Each run holds a lease on the session; logging out cancels it and wipes the store only
/// after the run has stopped.
pub struct CourseSyncService {
    network: Arc<NetworkDataSource>,
    local: LocalDataSource,
    session: Arc<Session>,
    locks: CourseLocks,
    states: CourseStates,
}

impl CourseSyncService {
    pub fn new(network: Arc<NetworkDataSource>, local: LocalDataSource, session: Arc<Session>) -> Self {
        let locks = CourseLocks::default();
        let states = CourseStates::default();
        session.register_cleanup(Arc::new(SyncStateCleanup {
            locks: locks.clone(),
            states: states.clone(),
        }));

        Self {
            network,
            local,
            session,
            locks,
            states,
        }
    }

    /// In-memory state of the latest run in this session. `Idle` until a sync starts.
    pub fn state(&self, course_id: CourseId) -> SyncState {
        *self.sender(course_id).borrow()
    }

    pub fn observe(&self, course_id: CourseId) -> watch::Receiver<SyncState> {
        self.sender(course_id).subscribe()
    }

    pub async fn sync_course(
        &self,
        course_id: CourseId,
        cancel: &CancelToken,
    ) -> Result<SyncReport, SyncError> {
        let lock = self.course_lock(course_id);
        let result = {
            let _guard = lock.lock().await;
            self.sync_locked(course_id, cancel).await
        };
        self.release_lock(course_id, lock);

        result
    }

    /// Syncs several courses concurrently. Results come back in the order of `course_ids`.
    pub async fn sync_courses(
        &self,
        course_ids: &[CourseId],
        cancel: &CancelToken,
    ) -> Vec<Result<SyncReport, SyncError>> {
        join_all(course_ids.iter().map(|id| self.sync_course(*id, cancel))).await
    }

    /// Syncs only when the course was never synced or its last sync is older than `max_age`.
    pub async fn sync_if_stale(
        &self,
        course_id: CourseId,
        max_age: chrono::Duration,
        cancel: &CancelToken,
    ) -> Result<Option<SyncReport>, SyncError> {
        let metadata = self
            .local
            .sync_metadata(course_id)
            .await
            .map_err(|e| SyncError::store(course_id, e))?;

        match metadata {
            Some(meta) if !meta.needs_sync(Utc::now(), max_age) => {
                debug!("course {} is fresh, last synced at {}", course_id, meta.last_synced_at);
                Ok(None)
            }
            _ => self.sync_course(course_id, cancel).await.map(Some),
        }
    }

    async fn sync_locked(
        &self,
        course_id: CourseId,
        cancel: &CancelToken,
    ) -> Result<SyncReport, SyncError> {
        let Some(lease) = self.session.lease().await else {
            let err = SyncError::SessionEnded(course_id);
            warn!("{}", err);
            return Err(err);
        };

        info!("Starting sync of course {}", course_id);
        self.publish(course_id, SyncState::Syncing);

        let settings = match self.local.sync_settings(course_id).await {
            Ok(settings) => settings,
            Err(e) => {
                let err = SyncError::store(course_id, e);
                warn!("{}", err);
                self.publish(course_id, SyncState::Failed);
                return Err(err);
            }
        };

        let mut progress = SyncProgress::start(course_id, &settings.selected_stages());
        self.persist(&lease, &progress).await;

        let result = self.run(&settings, &mut progress, cancel, &lease).await;

        match &result {
            Ok(report) => {
                progress.complete();
                info!(
                    "Sync of course {} completed: {} sections, {} tabs, {} enrollments, {} grading periods",
                    course_id,
                    report.sections,
                    report.tabs,
                    report.enrollments,
                    report.grading_periods
                );
            }
            Err(e) => {
                progress.fail(e.to_string());
                warn!("{}", e);
            }
        }
        self.persist(&lease, &progress).await;
        self.publish(course_id, progress.state);

        result
    }

    async fn run(
        &self,
        settings: &CourseSyncSettings,
        progress: &mut SyncProgress,
        cancel: &CancelToken,
        lease: &SessionLease,
    ) -> Result<SyncReport, SyncError> {
        let course_id = settings.course_id;

        let mut course = self
            .fetch_stage(
                progress,
                SyncStage::Course,
                cancel,
                lease,
                self.network.fetch_course_details(course_id, true),
            )
            .await?;

        course.sections = self
            .fetch_stage(
                progress,
                SyncStage::Sections,
                cancel,
                lease,
                self.network.get_sections(course_id, true),
            )
            .await?;

        course.tabs = self
            .fetch_stage(
                progress,
                SyncStage::Tabs,
                cancel,
                lease,
                self.network.get_tabs(course_id, true),
            )
            .await?;

        course.enrollments = self
            .fetch_stage(
                progress,
                SyncStage::Enrollments,
                cancel,
                lease,
                self.network.get_enrollments(course_id, true),
            )
            .await?;

        // An unselected grading period list stays empty, which removes its rows on write.
        if settings.is_stage_selected(SyncStage::GradingPeriods) {
            course.grading_periods = self
                .fetch_stage(
                    progress,
                    SyncStage::GradingPeriods,
                    cancel,
                    lease,
                    self.network.get_grading_periods(course_id, true),
                )
                .await?;
        }

        if lease.is_ended() {
            return Err(SyncError::SessionEnded(course_id));
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled(course_id));
        }

        let synced_at = Utc::now();
        self.local
            .save_course(&course, synced_at)
            .await
            .map_err(|e| SyncError::store(course_id, e))?;

        Ok(SyncReport {
            course_id,
            run_id: progress.run_id.clone(),
            sections: course.sections.len(),
            tabs: course.tabs.len(),
            enrollments: course.enrollments.len(),
            grading_periods: course.grading_periods.len(),
            synced_at,
        })
    }

    async fn fetch_stage<T>(
        &self,
        progress: &mut SyncProgress,
        stage: SyncStage,
        cancel: &CancelToken,
        lease: &SessionLease,
        fetch: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, SyncError> {
        let course_id = progress.course_id;
        progress.set_stage(stage, StageState::InProgress);
        self.persist(lease, progress).await;

        let result = tokio::select! {
            biased;
            _ = lease.ended().cancelled() => Err(SyncError::SessionEnded(course_id)),
            _ = cancel.cancelled() => Err(SyncError::Cancelled(course_id)),
            result = fetch => result.map_err(|e| SyncError::fetch(course_id, stage, e)),
        };

        match &result {
            Ok(_) => {
                debug!("course {}: fetched {}", course_id, stage);
                progress.set_stage(stage, StageState::Completed);
            }
            Err(_) => progress.set_stage(stage, StageState::Error),
        }
        self.persist(lease, progress).await;

        result
    }

    /// Progress is informational; failing to record it does not fail the sync.
    /// Nothing is recorded once the session has ended.
    async fn persist(&self, lease: &SessionLease, progress: &SyncProgress) {
        if lease.is_ended() {
            debug!("session ended, progress of course {} not saved", progress.course_id);
            return;
        }
        if let Err(e) = self.local.save_sync_progress(progress).await {
            warn!("failed to save sync progress of course {}: {}", progress.course_id, e);
        }
    }

    fn course_lock(&self, course_id: CourseId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(course_id).or_default().clone()
    }

    /// Drops the map entry once no other run holds or waits on the lock.
    fn release_lock(&self, course_id: CourseId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        drop(lock);
        if locks
            .get(&course_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&course_id);
        }
    }

    fn sender(&self, course_id: CourseId) -> watch::Sender<SyncState> {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states
            .entry(course_id)
            .or_insert_with(|| watch::channel(SyncState::Idle).0)
            .clone()
    }

    fn publish(&self, course_id: CourseId, state: SyncState) {
        self.sender(course_id).send_replace(state);
    }
}

/// Forgets per-course sync state when the user logs out.
struct SyncStateCleanup {
    locks: CourseLocks,
    states: CourseStates,
}

#[async_trait]
impl CleanupHandler for SyncStateCleanup {
    async fn cleanup(&self) -> Result<(), AppError> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::canvas::{CanvasTransport, RawPage, RestParams};
    use crate::db;
    use crate::models::UserId;
    use crate::session::User;

    /// Answers every course endpoint with an empty but valid payload.
    struct EmptyCourseTransport;

    #[async_trait]
    impl CanvasTransport for EmptyCourseTransport {
        async fn get(&self, url: &str, _params: &RestParams) -> Result<RawPage, AppError> {
            let body = if url.ends_with("grading_periods") {
                r#"{"grading_periods":[]}"#
            } else if url.contains("?include[]=term") {
                r#"{"id":5,"name":"Physics"}"#
            } else {
                "[]"
            };
            Ok(RawPage::last(body))
        }
    }

    async fn service_with_session() -> (CourseSyncService, Arc<Session>) {
        let pool = db::connect_in_memory().await.expect("Failed to open database");
        let session = Arc::new(Session::new(vec![]));
        session.init(
            User {
                id: UserId(1),
                name: "Ada".to_string(),
            },
            "token",
        );
        let service = CourseSyncService::new(
            Arc::new(NetworkDataSource::new(Arc::new(EmptyCourseTransport))),
            LocalDataSource::new(pool),
            session.clone(),
        );
        (service, session)
    }

    async fn service() -> CourseSyncService {
        service_with_session().await.0
    }

    #[tokio::test]
    async fn test_state_is_idle_before_first_sync() {
        let service = service().await;
        assert_eq!(service.state(CourseId(5)), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_observer_sees_completed() {
        let service = service().await;
        let mut rx = service.observe(CourseId(5));

        let report = service
            .sync_course(CourseId(5), &CancelToken::new())
            .await
            .expect("sync");

        assert_eq!(report.sections, 0);
        rx.wait_for(|state| state.is_finished()).await.expect("state");
        assert_eq!(*rx.borrow(), SyncState::Completed);
    }

    #[tokio::test]
    async fn test_progress_marks_every_stage_completed() {
        let service = service().await;
        service
            .sync_course(CourseId(5), &CancelToken::new())
            .await
            .expect("sync");

        let progress = service
            .local
            .sync_progress(CourseId(5))
            .await
            .expect("progress")
            .expect("progress row");
        assert_eq!(progress.state, SyncState::Completed);
        assert!(
            progress
                .stages
                .iter()
                .all(|p| p.state == StageState::Completed)
        );
    }

    #[tokio::test]
    async fn test_fresh_course_is_skipped() {
        let service = service().await;
        let cancel = CancelToken::new();
        service.sync_course(CourseId(5), &cancel).await.expect("sync");

        let skipped = service
            .sync_if_stale(CourseId(5), chrono::Duration::hours(1), &cancel)
            .await
            .expect("sync_if_stale");
        assert!(skipped.is_none());

        let resynced = service
            .sync_if_stale(CourseId(5), chrono::Duration::zero(), &cancel)
            .await
            .expect("sync_if_stale");
        assert!(resynced.is_some());
    }

    #[tokio::test]
    async fn test_course_lock_is_released_after_sync() {
        let service = service().await;
        service
            .sync_course(CourseId(5), &CancelToken::new())
            .await
            .expect("sync");

        assert!(service.locks.lock().expect("locks").is_empty());
    }

    #[tokio::test]
    async fn test_logout_resets_sync_state() {
        let (service, session) = service_with_session().await;
        service
            .sync_course(CourseId(5), &CancelToken::new())
            .await
            .expect("sync");
        assert_eq!(service.state(CourseId(5)), SyncState::Completed);

        session.clear().await.expect("clear");

        assert!(service.states.lock().expect("states").is_empty());
        assert_eq!(service.state(CourseId(5)), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_sync_without_session_is_refused() {
        let (service, session) = service_with_session().await;
        session.clear().await.expect("clear");

        let err = service
            .sync_course(CourseId(5), &CancelToken::new())
            .await
            .expect_err("no session");

        assert!(matches!(err, SyncError::SessionEnded(CourseId(5))));
        assert_eq!(service.state(CourseId(5)), SyncState::Idle);
        assert!(
            service
                .local
                .sync_progress(CourseId(5))
                .await
                .expect("progress")
                .is_none()
        );
    }
}
