use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(CourseId);
typed_id!(GroupId);
typed_id!(UserId);

/// Scope that remote entities are fetched and filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CanvasContext {
    Course(CourseId),
    Group(GroupId),
    User(UserId),
}

impl CanvasContext {
    pub fn type_name(&self) -> &'static str {
        match self {
            CanvasContext::Course(_) => "course",
            CanvasContext::Group(_) => "group",
            CanvasContext::User(_) => "user",
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            CanvasContext::Course(id) => id.0,
            CanvasContext::Group(id) => id.0,
            CanvasContext::User(id) => id.0,
        }
    }

    /// Context code as used by the API, e.g. `course_42`.
    pub fn context_code(&self) -> String {
        format!("{}_{}", self.type_name(), self.raw_id())
    }

    /// Path prefix for endpoints scoped to this context, e.g. `courses/42`.
    pub fn api_path(&self) -> String {
        format!("{}s/{}", self.type_name(), self.raw_id())
    }

    pub fn course_id(&self) -> Option<CourseId> {
        match self {
            CanvasContext::Course(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for CanvasContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.context_code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid context code: {0}")]
pub struct InvalidContextCode(pub String);

impl FromStr for CanvasContext {
    type Err = InvalidContextCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .rsplit_once('_')
            .ok_or_else(|| InvalidContextCode(s.to_string()))?;
        let id: i64 = id.parse().map_err(|_| InvalidContextCode(s.to_string()))?;

        match kind {
            "course" => Ok(CanvasContext::Course(CourseId(id))),
            "group" => Ok(CanvasContext::Group(GroupId(id))),
            "user" => Ok(CanvasContext::User(UserId(id))),
            _ => Err(InvalidContextCode(s.to_string())),
        }
    }
}
