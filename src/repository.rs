use std::sync::Arc;

use tracing::debug;

use crate::connectivity::Connectivity;
use crate::data_source::CourseDataSource;
use crate::error::AppError;
use crate::filter::CourseFilter;
use crate::models::{Course, CourseId, Enrollment, GradingPeriod, Section, Tab};

/// Single entry point for course reads. Online reads go to the network source,
/// offline reads to the local one; a network failure is never answered from cache.
pub struct CourseRepository {
    network: Arc<dyn CourseDataSource>,
    local: Arc<dyn CourseDataSource>,
    connectivity: Arc<dyn Connectivity>,
    filter: Arc<dyn CourseFilter>,
}

impl CourseRepository {
    pub fn new(
        network: Arc<dyn CourseDataSource>,
        local: Arc<dyn CourseDataSource>,
        connectivity: Arc<dyn Connectivity>,
        filter: Arc<dyn CourseFilter>,
    ) -> Self {
        Self {
            network,
            local,
            connectivity,
            filter,
        }
    }

    fn source(&self) -> &dyn CourseDataSource {
        if self.connectivity.is_online() {
            debug!("reading from network");
            &*self.network
        } else {
            debug!("offline, reading from local store");
            &*self.local
        }
    }

    pub async fn get_courses(&self, force_network: bool) -> Result<Vec<Course>, AppError> {
        self.source().get_courses(force_network).await
    }

    /// `get_courses` narrowed by the client's course filter.
    pub async fn get_dashboard_courses(&self, force_network: bool) -> Result<Vec<Course>, AppError> {
        let courses = self.get_courses(force_network).await?;
        Ok(courses
            .into_iter()
            .filter(|course| self.filter.include(course))
            .collect())
    }

    pub async fn get_course(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Option<Course>, AppError> {
        self.source().get_course(course_id, force_network).await
    }

    pub async fn get_enrollments(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<Enrollment>, AppError> {
        self.source().get_enrollments(course_id, force_network).await
    }

    pub async fn get_sections(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<Section>, AppError> {
        self.source().get_sections(course_id, force_network).await
    }

    pub async fn get_tabs(&self, course_id: CourseId, force_network: bool) -> Result<Vec<Tab>, AppError> {
        self.source().get_tabs(course_id, force_network).await
    }

    pub async fn get_grading_periods(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<GradingPeriod>, AppError> {
        self.source().get_grading_periods(course_id, force_network).await
    }
}
