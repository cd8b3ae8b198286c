use serde::{Deserialize, Serialize};

use super::context::{CourseId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub course_id: CourseId,
    pub user_id: UserId,
    pub role: EnrollmentRole,
    pub enrollment_state: EnrollmentState,
    pub course_section_id: Option<i64>,
    pub grades: Option<Grades>,
}

/// Grade snapshot carried by a student enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grades {
    pub current_score: Option<f64>,
    pub final_score: Option<f64>,
    pub current_grade: Option<String>,
    pub final_grade: Option<String>,
}

impl Grades {
    pub fn is_empty(&self) -> bool {
        self.current_score.is_none()
            && self.final_score.is_none()
            && self.current_grade.is_none()
            && self.final_grade.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentRole {
    Student,
    Teacher,
    Ta,
    Observer,
    Designer,
    Other,
}

impl EnrollmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentRole::Student => "student",
            EnrollmentRole::Teacher => "teacher",
            EnrollmentRole::Ta => "ta",
            EnrollmentRole::Observer => "observer",
            EnrollmentRole::Designer => "designer",
            EnrollmentRole::Other => "other",
        }
    }

    /// Accepts both the enrollment `type` (`StudentEnrollment`) and the short
    /// form embedded in course payloads (`student`).
    pub fn from_api(value: &str) -> Self {
        let lower = value.to_ascii_lowercase();
        match lower.strip_suffix("enrollment").unwrap_or(&lower) {
            "student" => EnrollmentRole::Student,
            "teacher" => EnrollmentRole::Teacher,
            "ta" => EnrollmentRole::Ta,
            "observer" => EnrollmentRole::Observer,
            "designer" => EnrollmentRole::Designer,
            _ => EnrollmentRole::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    Active,
    Invited,
    CreationPending,
    Completed,
    Inactive,
    Rejected,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl EnrollmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentState::Active => "active",
            EnrollmentState::Invited => "invited",
            EnrollmentState::CreationPending => "creation_pending",
            EnrollmentState::Completed => "completed",
            EnrollmentState::Inactive => "inactive",
            EnrollmentState::Rejected => "rejected",
            EnrollmentState::Deleted => "deleted",
            EnrollmentState::Unknown => "unknown",
        }
    }

    pub fn from_api(value: &str) -> Self {
        match value {
            "active" => EnrollmentState::Active,
            "invited" => EnrollmentState::Invited,
            "creation_pending" => EnrollmentState::CreationPending,
            "completed" => EnrollmentState::Completed,
            "inactive" => EnrollmentState::Inactive,
            "rejected" => EnrollmentState::Rejected,
            "deleted" => EnrollmentState::Deleted,
            _ => EnrollmentState::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_enrollment_type() {
        assert_eq!(EnrollmentRole::from_api("StudentEnrollment"), EnrollmentRole::Student);
        assert_eq!(EnrollmentRole::from_api("TaEnrollment"), EnrollmentRole::Ta);
        assert_eq!(EnrollmentRole::from_api("teacher"), EnrollmentRole::Teacher);
        assert_eq!(EnrollmentRole::from_api("StudentViewEnrollment"), EnrollmentRole::Other);
    }

    #[test]
    fn test_state_round_trips_through_text() {
        for state in [
            EnrollmentState::Active,
            EnrollmentState::Invited,
            EnrollmentState::CreationPending,
            EnrollmentState::Completed,
            EnrollmentState::Inactive,
            EnrollmentState::Rejected,
            EnrollmentState::Deleted,
        ] {
            assert_eq!(EnrollmentState::from_api(state.as_str()), state);
        }
        assert_eq!(EnrollmentState::from_api("bogus"), EnrollmentState::Unknown);
    }

    #[test]
    fn test_unknown_state_deserializes() {
        let state: EnrollmentState = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(state, EnrollmentState::Unknown);
    }
}
