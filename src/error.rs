use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::{CourseId, SyncStage};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Internal server error")]
    InternalServerError,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

/// Failure of a whole course sync. The local store keeps its previous contents.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync of course {course_id} failed while fetching {stage}: {source}")]
    Fetch {
        course_id: CourseId,
        stage: SyncStage,
        #[source]
        source: Box<AppError>,
    },

    #[error("sync of course {course_id} failed on the local store: {source}")]
    Store {
        course_id: CourseId,
        #[source]
        source: Box<AppError>,
    },

    #[error("sync of course {0} was cancelled")]
    Cancelled(CourseId),

    #[error("sync of course {0} stopped: no active session")]
    SessionEnded(CourseId),
}

impl SyncError {
    pub fn fetch(course_id: CourseId, stage: SyncStage, source: AppError) -> Self {
        SyncError::Fetch {
            course_id,
            stage,
            source: Box::new(source),
        }
    }

    pub fn store(course_id: CourseId, source: impl Into<AppError>) -> Self {
        SyncError::Store {
            course_id,
            source: Box::new(source.into()),
        }
    }

    pub fn course_id(&self) -> CourseId {
        match self {
            SyncError::Fetch { course_id, .. } | SyncError::Store { course_id, .. } => *course_id,
            SyncError::Cancelled(course_id) | SyncError::SessionEnded(course_id) => *course_id,
        }
    }

    /// The nested fetch that failed, if the failure happened on the network.
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            SyncError::Fetch { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// A failed fetch or write answers with the status of what failed underneath.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::Fetch { source, .. } | SyncError::Store { source, .. } => source.status_code(),
            SyncError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::SessionEnded(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Network(_) | AppError::Decode(_) => StatusCode::BAD_GATEWAY,
            AppError::Sync(e) => e.status_code(),
            AppError::Database(_) | AppError::Migration(_) | AppError::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::NotFound => "Not Found".to_string(),
            AppError::BadRequest(msg)
            | AppError::Auth(msg)
            | AppError::Network(msg)
            | AppError::Decode(msg) => msg,
            AppError::Sync(e) => {
                error!("sync error: {}", e);
                e.to_string()
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                "Database error occurred".to_string()
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                "Database error occurred".to_string()
            }
            AppError::InternalServerError => "Internal server error".to_string(),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
