use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::CourseDataSource;
use crate::canvas::dto::{
    CourseDto, EnrollmentDto, GradingPeriodDto, GradingPeriodsResponse, SectionDto, TabDto,
    UserDto,
};
use crate::canvas::pagination::{decode_list, depaginate};
use crate::canvas::{CanvasTransport, RestParams, endpoints};
use crate::error::AppError;
use crate::models::{Course, CourseId, Enrollment, GradingPeriod, Section, Tab};
use crate::session::User;

pub struct NetworkDataSource {
    transport: Arc<dyn CanvasTransport>,
}

impl NetworkDataSource {
    pub fn new(transport: Arc<dyn CanvasTransport>) -> Self {
        Self { transport }
    }

    /// The course record itself with its term, no child collections.
    pub async fn fetch_course_details(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Course, AppError> {
        let page = self
            .transport
            .get(&endpoints::course(course_id), &RestParams::new(force_network))
            .await?;
        let dto: CourseDto = serde_json::from_str(&page.body)?;
        Ok(dto.into_course())
    }

    /// The user `token` belongs to. Works without an active session.
    pub async fn fetch_current_user(&self, token: &str) -> Result<User, AppError> {
        let page = self
            .transport
            .get_with_token(endpoints::CURRENT_USER, &RestParams::new(true), token)
            .await?;
        let dto: UserDto = serde_json::from_str(&page.body)?;
        Ok(dto.into_user())
    }
}

#[async_trait]
impl CourseDataSource for NetworkDataSource {
    async fn get_courses(&self, force_network: bool) -> Result<Vec<Course>, AppError> {
        let courses = depaginate(
            &*self.transport,
            &endpoints::courses(),
            &RestParams::new(force_network),
            decode_list::<CourseDto>,
        )
        .await?;

        Ok(courses.into_iter().map(CourseDto::into_course).collect())
    }

    async fn get_course(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Option<Course>, AppError> {
        let mut course = self.fetch_course_details(course_id, force_network).await?;

        let (sections, tabs, enrollments, grading_periods) = tokio::try_join!(
            self.get_sections(course_id, force_network),
            self.get_tabs(course_id, force_network),
            self.get_enrollments(course_id, force_network),
            self.get_grading_periods(course_id, force_network),
        )?;
        debug!(
            "fetched course {} with {} sections, {} tabs, {} enrollments",
            course_id,
            sections.len(),
            tabs.len(),
            enrollments.len()
        );

        course.sections = sections;
        course.tabs = tabs;
        course.enrollments = enrollments;
        course.grading_periods = grading_periods;

        Ok(Some(course))
    }

    async fn get_enrollments(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<Enrollment>, AppError> {
        let enrollments = depaginate(
            &*self.transport,
            &endpoints::enrollments(course_id),
            &RestParams::new(force_network),
            decode_list::<EnrollmentDto>,
        )
        .await?;

        Ok(enrollments
            .into_iter()
            .map(|dto| dto.into_enrollment(course_id))
            .collect())
    }

    async fn get_sections(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<Section>, AppError> {
        let sections = depaginate(
            &*self.transport,
            &endpoints::sections(course_id),
            &RestParams::new(force_network),
            decode_list::<SectionDto>,
        )
        .await?;

        Ok(sections
            .into_iter()
            .map(|dto| dto.into_section(course_id))
            .collect())
    }

    async fn get_tabs(&self, course_id: CourseId, force_network: bool) -> Result<Vec<Tab>, AppError> {
        let tabs = depaginate(
            &*self.transport,
            &endpoints::tabs(course_id),
            &RestParams::new(force_network),
            decode_list::<TabDto>,
        )
        .await?;

        Ok(tabs.into_iter().map(TabDto::into_tab).collect())
    }

    async fn get_grading_periods(
        &self,
        course_id: CourseId,
        force_network: bool,
    ) -> Result<Vec<GradingPeriod>, AppError> {
        // Grading periods come wrapped in an object on every page.
        let periods = depaginate(
            &*self.transport,
            &endpoints::grading_periods(course_id),
            &RestParams::new(force_network),
            |body| {
                let response: GradingPeriodsResponse = serde_json::from_str(body)?;
                Ok(response.grading_periods)
            },
        )
        .await?;

        Ok(periods
            .into_iter()
            .map(GradingPeriodDto::into_grading_period)
            .collect())
    }
}
