#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use offline_sync::canvas::{CanvasTransport, RawPage, RestParams};
use offline_sync::data_source::{LocalDataSource, NetworkDataSource};
use offline_sync::db;
use offline_sync::error::AppError;
use offline_sync::models::UserId;
use offline_sync::services::CourseSyncService;
use offline_sync::session::{LocalStoreCleanup, Session, User};
use sqlx::SqlitePool;

#[derive(Clone)]
enum Reply {
    Page(RawPage),
    Status(u16),
}

/// In-memory stand-in for the course API, keyed by the exact URL requested.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, Reply>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, RestParams)>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, url: &str, body: &str, next_url: Option<&str>) {
        self.replies.lock().unwrap().insert(
            url.to_string(),
            Reply::Page(RawPage {
                body: body.to_string(),
                next_url: next_url.map(String::from),
            }),
        );
    }

    pub fn status(&self, url: &str, status: u16) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Status(status));
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, RestParams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .count()
    }
}

#[async_trait]
impl CanvasTransport for FakeTransport {
    async fn get(&self, url: &str, params: &RestParams) -> Result<RawPage, AppError> {
        self.calls.lock().unwrap().push((url.to_string(), *params));

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Page(page)) => Ok(page),
            Some(Reply::Status(401)) => Err(AppError::Auth("invalid token".to_string())),
            Some(Reply::Status(404)) | None => Err(AppError::NotFound),
            Some(Reply::Status(code)) => Err(AppError::Network(format!("status {}", code))),
        }
    }
}

pub const COURSE_42: &str = "api/v1/courses/42?include[]=term";
pub const SECTIONS_42: &str = "api/v1/courses/42/sections";
pub const TABS_42: &str = "api/v1/courses/42/tabs";
pub const ENROLLMENTS_42: &str = "api/v1/courses/42/enrollments";
pub const GRADING_PERIODS_42: &str = "api/v1/courses/42/grading_periods";
pub const CURRENT_USER: &str = "api/v1/users/self";

/// Serves course 42 with a term, two sections, three tabs, two enrollments and one
/// grading period. Collections are listed in the order the local store reads them back.
pub fn serve_course_42(transport: &FakeTransport) {
    transport.page(
        COURSE_42,
        r#"{
            "id": 42,
            "name": "Introduction to Biology",
            "course_code": "BIO-101",
            "term": {"id": 7, "name": "Fall 2024", "start_at": "2024-09-01T00:00:00Z", "end_at": "2024-12-20T00:00:00Z"},
            "enrollments": [{"type": "student", "role": "StudentEnrollment", "enrollment_state": "active"}]
        }"#,
        None,
    );
    transport.page(
        SECTIONS_42,
        r#"[
            {"id": 100, "course_id": 42, "name": "Lecture A"},
            {"id": 101, "course_id": 42, "name": "Lab B", "start_at": "2024-09-03T08:00:00Z"}
        ]"#,
        None,
    );
    transport.page(
        TABS_42,
        r#"[
            {"id": "home", "label": "Home", "position": 1, "visibility": "public"},
            {"id": "grades", "label": "Grades", "position": 2, "visibility": "members"},
            {"id": "people", "label": "People", "position": 3, "hidden": false, "visibility": "members"}
        ]"#,
        None,
    );
    transport.page(
        ENROLLMENTS_42,
        r#"[
            {"id": 500, "course_id": 42, "user_id": 9, "type": "StudentEnrollment", "enrollment_state": "active",
             "course_section_id": 100, "grades": {"current_score": 91.5, "final_score": 88.0, "current_grade": "A-", "final_grade": "B+"}},
            {"id": 501, "course_id": 42, "user_id": 3, "type": "TeacherEnrollment", "enrollment_state": "active"}
        ]"#,
        None,
    );
    transport.page(
        GRADING_PERIODS_42,
        r#"{"grading_periods": [
            {"id": 1, "title": "Q1", "start_date": "2024-09-01T00:00:00Z", "end_date": "2024-10-31T00:00:00Z", "is_closed": true}
        ]}"#,
        None,
    );
}

pub async fn setup_test_db() -> SqlitePool {
    db::connect_in_memory()
        .await
        .expect("Failed to create database")
}

pub fn student() -> User {
    User {
        id: UserId(9),
        name: "Sam Student".to_string(),
    }
}

/// A session signed in as [`student`] whose logout wipes `pool`.
pub fn signed_in_session(pool: &SqlitePool) -> Arc<Session> {
    let session = Arc::new(Session::new(vec![Arc::new(LocalStoreCleanup::new(
        pool.clone(),
    ))]));
    session.init(student(), "test-token");
    session
}

pub fn sync_service(transport: Arc<FakeTransport>, pool: &SqlitePool) -> CourseSyncService {
    sync_service_for(transport, pool, signed_in_session(pool))
}

pub fn sync_service_for(
    transport: Arc<FakeTransport>,
    pool: &SqlitePool,
    session: Arc<Session>,
) -> CourseSyncService {
    CourseSyncService::new(
        Arc::new(NetworkDataSource::new(transport)),
        LocalDataSource::new(pool.clone()),
        session,
    )
}
