pub mod local;
pub mod network;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Course, CourseId, Enrollment, GradingPeriod, Section, Tab};

pub use local::LocalDataSource;
pub use network::NetworkDataSource;

/// Read access to course data, implemented once over the remote API and once over
/// the local store so callers can swap one for the other.
///
/// `get_courses` returns course summaries; `get_course` returns the full graph.
/// A course the source does not know is `Ok(None)` locally and `Err(NotFound)` remotely.
#[async_trait]
pub trait CourseDataSource: Send + Sync {
    async fn get_courses(&self, force_network: bool) -> Result<Vec<Course>, AppError>;

    async fn get_course(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Option<Course>, AppError>;

    async fn get_enrollments(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<Enrollment>, AppError>;

    async fn get_sections(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<Section>, AppError>;

    async fn get_tabs(&self, course_id: CourseId, force_network: bool) -> Result<Vec<Tab>, AppError>;

    async fn get_grading_periods(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<GradingPeriod>, AppError>;
}
