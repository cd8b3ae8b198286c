use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Course, CourseId, CourseSyncSettings, SyncProgress, SyncReport};
use crate::state::AppState;

#[derive(Deserialize)]
struct CourseQueryParams {
    #[serde(default)]
    force_network: bool,
    #[serde(default)]
    dashboard: bool,
}

#[derive(Deserialize)]
struct SyncSettingsRequest {
    enabled: bool,
    #[serde(default)]
    tabs: BTreeSet<String>,
}

#[derive(Serialize)]
struct ConnectivityResponse {
    online: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/connectivity", get(connectivity))
        .route("/courses", get(list_courses))
        .route("/courses/{id}", get(get_course))
        .route("/courses/{id}/sync", post(sync_course).get(sync_progress))
        .route(
            "/courses/{id}/sync/settings",
            put(update_sync_settings).get(get_sync_settings),
        )
        .route("/session/logout", post(logout))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn connectivity(State(state): State<AppState>) -> Json<ConnectivityResponse> {
    Json(ConnectivityResponse {
        online: state.connectivity.is_online(),
    })
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = if params.dashboard {
        state.repository.get_dashboard_courses(params.force_network).await?
    } else {
        state.repository.get_courses(params.force_network).await?
    };
    Ok(Json(courses))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<Course>, AppError> {
    let course = state
        .repository
        .get_course(id, params.force_network)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn sync_course(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state.sync.sync_course(id, &state.shutdown).await?;
    Ok(Json(report))
}

async fn sync_progress(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
) -> Result<Json<SyncProgress>, AppError> {
    let progress = state
        .local
        .sync_progress(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(progress))
}

async fn get_sync_settings(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
) -> Result<Json<CourseSyncSettings>, AppError> {
    Ok(Json(state.local.sync_settings(id).await?))
}

async fn update_sync_settings(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
    Json(req): Json<SyncSettingsRequest>,
) -> Result<Json<CourseSyncSettings>, AppError> {
    let settings = CourseSyncSettings {
        course_id: id,
        enabled: req.enabled,
        tabs: req.tabs,
    };
    state.local.save_sync_settings(&settings).await?;
    Ok(Json(settings))
}

async fn logout(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.session.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
