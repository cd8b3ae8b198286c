use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{
    Course, CourseId, Enrollment, EnrollmentRole, EnrollmentState, GradingPeriod, Grades, Section,
    Tab, Term, UserId,
};
use crate::session::User;

#[derive(Debug, Deserialize)]
pub struct CourseDto {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub term: Option<TermDto>,
    /// The requesting user's own enrollments in the course.
    #[serde(default)]
    pub enrollments: Option<Vec<CourseEnrollmentDto>>,
}

#[derive(Debug, Deserialize)]
pub struct CourseEnrollmentDto {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub enrollment_state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TermDto {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SectionDto {
    pub id: i64,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentDto {
    pub id: i64,
    #[serde(default)]
    pub course_id: Option<i64>,
    pub user_id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub enrollment_state: Option<String>,
    #[serde(default)]
    pub course_section_id: Option<i64>,
    #[serde(default)]
    pub grades: Option<GradesDto>,
}

#[derive(Debug, Deserialize)]
pub struct GradesDto {
    #[serde(default)]
    pub current_score: Option<f64>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub current_grade: Option<String>,
    #[serde(default)]
    pub final_grade: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TabDto {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GradingPeriodsResponse {
    #[serde(default)]
    pub grading_periods: Vec<GradingPeriodDto>,
}

#[derive(Debug, Deserialize)]
pub struct GradingPeriodDto {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_closed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

impl CourseDto {
    pub fn into_course(self) -> Course {
        let own = self.enrollments.as_ref().and_then(|e| e.first());
        let enrollment_role = own
            .and_then(|e| e.kind.as_deref().or(e.role.as_deref()))
            .map(EnrollmentRole::from_api);
        let enrollment_state = own
            .and_then(|e| e.enrollment_state.as_deref())
            .map(EnrollmentState::from_api);

        Course {
            id: CourseId(self.id),
            name: self.name.unwrap_or_default(),
            course_code: self.course_code,
            enrollment_state,
            enrollment_role,
            term: self.term.map(TermDto::into_term),
            sections: Vec::new(),
            tabs: Vec::new(),
            enrollments: Vec::new(),
            grading_periods: Vec::new(),
        }
    }
}

impl TermDto {
    pub fn into_term(self) -> Term {
        Term {
            id: self.id,
            name: self.name.unwrap_or_default(),
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

impl SectionDto {
    pub fn into_section(self, course_id: CourseId) -> Section {
        Section {
            id: self.id,
            course_id: self.course_id.map(CourseId).unwrap_or(course_id),
            name: self.name.unwrap_or_default(),
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

impl EnrollmentDto {
    pub fn into_enrollment(self, course_id: CourseId) -> Enrollment {
        let role = self
            .kind
            .as_deref()
            .or(self.role.as_deref())
            .map(EnrollmentRole::from_api)
            .unwrap_or(EnrollmentRole::Other);

        Enrollment {
            id: self.id,
            course_id: self.course_id.map(CourseId).unwrap_or(course_id),
            user_id: UserId(self.user_id),
            role,
            enrollment_state: EnrollmentState::from_api(
                self.enrollment_state.as_deref().unwrap_or_default(),
            ),
            course_section_id: self.course_section_id,
            // An all-null grades object carries nothing the store could keep apart from absence.
            grades: self.grades.map(GradesDto::into_grades).filter(|g| !g.is_empty()),
        }
    }
}

impl GradesDto {
    pub fn into_grades(self) -> Grades {
        Grades {
            current_score: self.current_score,
            final_score: self.final_score,
            current_grade: self.current_grade,
            final_grade: self.final_grade,
        }
    }
}

impl TabDto {
    pub fn into_tab(self) -> Tab {
        Tab {
            label: self.label.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            position: self.position.unwrap_or_default(),
            hidden: self.hidden.unwrap_or_default(),
            visibility: self.visibility,
        }
    }
}

impl GradingPeriodDto {
    pub fn into_grading_period(self) -> GradingPeriod {
        GradingPeriod {
            id: self.id,
            title: self.title.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            is_closed: self.is_closed.unwrap_or_default(),
        }
    }
}

impl UserDto {
    pub fn into_user(self) -> User {
        User {
            id: UserId(self.id),
            name: self.name.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_payload() {
        let json = r#"{
            "id": 42,
            "name": "Biology 101",
            "course_code": "BIO101",
            "term": {"id": 3, "name": "Fall 2024", "start_at": "2024-09-01T00:00:00Z", "end_at": null},
            "enrollments": [{"type": "student", "role": "StudentEnrollment", "enrollment_state": "active", "user_id": 5}],
            "workflow_state": "available"
        }"#;

        let course = serde_json::from_str::<CourseDto>(json).unwrap().into_course();

        assert_eq!(course.id, CourseId(42));
        assert_eq!(course.course_code.as_deref(), Some("BIO101"));
        assert_eq!(course.enrollment_role, Some(EnrollmentRole::Student));
        assert_eq!(course.enrollment_state, Some(EnrollmentState::Active));
        let term = course.term.expect("term");
        assert_eq!(term.name, "Fall 2024");
        assert!(term.start_at.is_some());
        assert!(term.end_at.is_none());
    }

    #[test]
    fn test_enrollment_payload() {
        let json = r#"{
            "id": 900, "course_id": 42, "user_id": 5, "type": "TeacherEnrollment",
            "enrollment_state": "invited", "course_section_id": 7,
            "grades": {"current_score": null, "final_score": null, "current_grade": null, "final_grade": null}
        }"#;

        let enrollment = serde_json::from_str::<EnrollmentDto>(json)
            .unwrap()
            .into_enrollment(CourseId(1));

        assert_eq!(enrollment.course_id, CourseId(42));
        assert_eq!(enrollment.role, EnrollmentRole::Teacher);
        assert_eq!(enrollment.enrollment_state, EnrollmentState::Invited);
        assert_eq!(enrollment.grades, None);
    }

    #[test]
    fn test_tab_defaults() {
        let tab = serde_json::from_str::<TabDto>(r#"{"id": "grades"}"#)
            .unwrap()
            .into_tab();
        assert_eq!(tab.label, "grades");
        assert_eq!(tab.position, 0);
        assert!(!tab.hidden);
    }
}
