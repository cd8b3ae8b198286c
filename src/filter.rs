use crate::models::{Course, EnrollmentRole, EnrollmentState};

/// Decides which courses a particular client shows on its dashboard.
pub trait CourseFilter: Send + Sync {
    fn include(&self, course: &Course) -> bool;
}

pub struct AllCourses;

impl CourseFilter for AllCourses {
    fn include(&self, _course: &Course) -> bool {
        true
    }
}

/// Courses the user is actively (or about to be) enrolled in.
pub struct ActiveCourses;

impl CourseFilter for ActiveCourses {
    fn include(&self, course: &Course) -> bool {
        matches!(
            course.enrollment_state,
            Some(EnrollmentState::Active) | Some(EnrollmentState::Invited)
        )
    }
}

/// Courses where the user's own enrollment has one of the given roles.
pub struct RoleFilter {
    roles: Vec<EnrollmentRole>,
}

impl RoleFilter {
    pub fn new(roles: impl IntoIterator<Item = EnrollmentRole>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    pub fn teaching() -> Self {
        Self::new([EnrollmentRole::Teacher, EnrollmentRole::Ta, EnrollmentRole::Designer])
    }
}

impl CourseFilter for RoleFilter {
    fn include(&self, course: &Course) -> bool {
        course
            .enrollment_role
            .is_some_and(|role| self.roles.contains(&role))
    }
}
