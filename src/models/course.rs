use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::CourseId;
use super::enrollment::{Enrollment, EnrollmentRole, EnrollmentState};

/// A course together with the collections synced alongside it.
///
/// List reads return summaries: `term` is populated but the child collections are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub course_code: Option<String>,
    pub enrollment_state: Option<EnrollmentState>,
    pub enrollment_role: Option<EnrollmentRole>,
    pub term: Option<Term>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub grading_periods: Vec<GradingPeriod>,
}

impl Course {
    /// Same course with child collections stripped.
    pub fn summary(&self) -> Course {
        Course {
            sections: Vec::new(),
            tabs: Vec::new(),
            enrollments: Vec::new(),
            grading_periods: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: i64,
    pub name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub course_id: CourseId,
    pub name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub label: String,
    pub position: i32,
    pub hidden: bool,
    pub visibility: Option<String>,
}

impl Tab {
    pub const HOME: &'static str = "home";
    pub const ASSIGNMENTS: &'static str = "assignments";
    pub const GRADES: &'static str = "grades";
    pub const PEOPLE: &'static str = "people";
    pub const PAGES: &'static str = "pages";
    pub const SYLLABUS: &'static str = "syllabus";
    pub const MODULES: &'static str = "modules";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPeriod {
    pub id: i64,
    pub title: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_closed: bool,
}
