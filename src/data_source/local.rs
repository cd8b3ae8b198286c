use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::CourseDataSource;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    Course, CourseId, CourseSyncSettings, Enrollment, GradingPeriod, Section, SyncMetadata,
    SyncProgress, Tab,
};

/// The on-device replica. Reads never fail because something is missing.
#[derive(Clone)]
pub struct LocalDataSource {
    db: SqlitePool,
}

impl LocalDataSource {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Replaces everything stored for `course` in one transaction.
    pub async fn save_course(&self, course: &Course, synced_at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        repository::save_course_graph(&mut tx, course, synced_at).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn sync_metadata(&self, course_id: CourseId) -> Result<Option<SyncMetadata>, AppError> {
        Ok(repository::find_sync_metadata(&self.db, course_id).await?)
    }

    /// Stored settings, or everything selected when none were saved.
    pub async fn sync_settings(&self, course_id: CourseId) -> Result<CourseSyncSettings, AppError> {
        Ok(repository::find_sync_settings(&self.db, course_id)
            .await?
            .unwrap_or_else(|| CourseSyncSettings::all(course_id)))
    }

    pub async fn save_sync_settings(&self, settings: &CourseSyncSettings) -> Result<(), AppError> {
        Ok(repository::upsert_sync_settings(&self.db, settings).await?)
    }

    pub async fn enabled_sync_settings(&self) -> Result<Vec<CourseSyncSettings>, AppError> {
        Ok(repository::fetch_enabled_sync_settings(&self.db).await?)
    }

    pub async fn sync_progress(&self, course_id: CourseId) -> Result<Option<SyncProgress>, AppError> {
        Ok(repository::find_sync_progress(&self.db, course_id).await?)
    }

    pub async fn save_sync_progress(&self, progress: &SyncProgress) -> Result<(), AppError> {
        Ok(repository::upsert_sync_progress(&self.db, progress).await?)
    }
}

#[async_trait]
impl CourseDataSource for LocalDataSource {
    async fn get_courses(&self, _force_network: bool) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_courses(&self.db).await?)
    }

    async fn get_course(
        &self,
        course_id: CourseId,
        _force_network: bool,
    ) -> Result<Option<Course>, AppError> {
        // Whole graph from one snapshot.
        let mut tx = self.db.begin().await?;
        let Some(mut course) = repository::find_course_by_id(&mut *tx, course_id).await? else {
            return Ok(None);
        };

        course.sections = repository::fetch_sections(&mut *tx, course_id).await?;
        course.tabs = repository::fetch_tabs(&mut *tx, course_id).await?;
        course.enrollments = repository::fetch_enrollments(&mut *tx, course_id).await?;
        course.grading_periods = repository::fetch_grading_periods(&mut *tx, course_id).await?;
        tx.commit().await?;

        Ok(Some(course))
    }

    async fn get_enrollments(
        &self,
        course_id: CourseId,
        _force_network: bool,
    ) -> Result<Vec<Enrollment>, AppError> {
        Ok(repository::fetch_enrollments(&self.db, course_id).await?)
    }

    async fn get_sections(
        &self,
        course_id: CourseId,
        _force_network: bool,
    ) -> Result<Vec<Section>, AppError> {
        Ok(repository::fetch_sections(&self.db, course_id).await?)
    }

    async fn get_tabs(&self, course_id: CourseId, _force_network: bool) -> Result<Vec<Tab>, AppError> {
        Ok(repository::fetch_tabs(&self.db, course_id).await?)
    }

    async fn get_grading_periods(
        &self,
        course_id: CourseId,
        _force_network: bool,
    ) -> Result<Vec<GradingPeriod>, AppError> {
        Ok(repository::fetch_grading_periods(&self.db, course_id).await?)
    }
}
