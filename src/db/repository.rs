use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use crate::models::{
    Course, CourseId, CourseSyncSettings, Enrollment, EnrollmentRole, EnrollmentState,
    GradingPeriod, Grades, Section, StageProgress, SyncMetadata, SyncProgress, SyncState, Tab,
    Term, UserId,
};

#[derive(Debug, FromRow)]
struct CourseRow {
    id: CourseId,
    name: String,
    course_code: Option<String>,
    enrollment_state: Option<String>,
    enrollment_role: Option<String>,
    term_id: Option<i64>,
    term_name: Option<String>,
    term_start_at: Option<DateTime<Utc>>,
    term_end_at: Option<DateTime<Utc>>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        let term = match (row.term_id, row.term_name) {
            (Some(id), Some(name)) => Some(Term {
                id,
                name,
                start_at: row.term_start_at,
                end_at: row.term_end_at,
            }),
            _ => None,
        };

        Course {
            id: row.id,
            name: row.name,
            course_code: row.course_code,
            enrollment_state: row.enrollment_state.as_deref().map(EnrollmentState::from_api),
            enrollment_role: row.enrollment_role.as_deref().map(EnrollmentRole::from_api),
            term,
            sections: Vec::new(),
            tabs: Vec::new(),
            enrollments: Vec::new(),
            grading_periods: Vec::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct EnrollmentRow {
    id: i64,
    course_id: CourseId,
    user_id: UserId,
    role: String,
    enrollment_state: String,
    course_section_id: Option<i64>,
    current_score: Option<f64>,
    final_score: Option<f64>,
    current_grade: Option<String>,
    final_grade: Option<String>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        let grades = Grades {
            current_score: row.current_score,
            final_score: row.final_score,
            current_grade: row.current_grade,
            final_grade: row.final_grade,
        };

        Enrollment {
            id: row.id,
            course_id: row.course_id,
            user_id: row.user_id,
            role: EnrollmentRole::from_api(&row.role),
            enrollment_state: EnrollmentState::from_api(&row.enrollment_state),
            course_section_id: row.course_section_id,
            grades: Some(grades).filter(|g| !g.is_empty()),
        }
    }
}

#[derive(Debug, FromRow)]
struct SectionRow {
    id: i64,
    course_id: CourseId,
    name: String,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct TabRow {
    id: String,
    label: String,
    position: i32,
    hidden: bool,
    visibility: Option<String>,
}

#[derive(Debug, FromRow)]
struct GradingPeriodRow {
    id: i64,
    title: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    is_closed: bool,
}

#[derive(Debug, FromRow)]
struct SyncSettingsRow {
    course_id: CourseId,
    enabled: bool,
    tabs: String,
}

impl SyncSettingsRow {
    fn into_settings(self) -> Result<CourseSyncSettings, sqlx::Error> {
        let tabs: BTreeSet<String> =
            serde_json::from_str(&self.tabs).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(CourseSyncSettings {
            course_id: self.course_id,
            enabled: self.enabled,
            tabs,
        })
    }
}

#[derive(Debug, FromRow)]
struct SyncProgressRow {
    course_id: CourseId,
    run_id: String,
    state: String,
    stages: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl SyncProgressRow {
    fn into_progress(self) -> Result<SyncProgress, sqlx::Error> {
        let stages: Vec<StageProgress> =
            serde_json::from_str(&self.stages).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(SyncProgress {
            course_id: self.course_id,
            run_id: self.run_id,
            state: SyncState::from_db(&self.state),
            stages,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error,
        })
    }
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CourseRow>(
        r#"
        SELECT
            c.id, c.name, c.course_code, c.enrollment_state, c.enrollment_role,
            t.id AS term_id, t.name AS term_name,
            t.start_at AS term_start_at, t.end_at AS term_end_at
        FROM courses c
        LEFT JOIN terms t ON t.id = c.term_id
        ORDER BY c.id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Course::from).collect())
}

pub async fn find_course_by_id<'e, E>(db: E, id: CourseId) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, CourseRow>(
        r#"
        SELECT
            c.id, c.name, c.course_code, c.enrollment_state, c.enrollment_role,
            t.id AS term_id, t.name AS term_name,
            t.start_at AS term_start_at, t.end_at AS term_end_at
        FROM courses c
        LEFT JOIN terms t ON t.id = c.term_id
        WHERE c.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(Course::from))
}

pub async fn fetch_sections<'e, E>(db: E, course_id: CourseId) -> Result<Vec<Section>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, SectionRow>(
        "SELECT id, course_id, name, start_at, end_at FROM sections WHERE course_id = ? ORDER BY id",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Section {
            id: row.id,
            course_id: row.course_id,
            name: row.name,
            start_at: row.start_at,
            end_at: row.end_at,
        })
        .collect())
}

pub async fn fetch_enrollments<'e, E>(db: E, course_id: CourseId) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, EnrollmentRow>(
        r#"
        SELECT id, course_id, user_id, role, enrollment_state, course_section_id,
            current_score, final_score, current_grade, final_grade
        FROM enrollments
        WHERE course_id = ?
        ORDER BY id
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Enrollment::from).collect())
}

pub async fn fetch_tabs<'e, E>(db: E, course_id: CourseId) -> Result<Vec<Tab>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, TabRow>(
        "SELECT id, label, position, hidden, visibility FROM tabs WHERE course_id = ? ORDER BY position, id",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Tab {
            id: row.id,
            label: row.label,
            position: row.position,
            hidden: row.hidden,
            visibility: row.visibility,
        })
        .collect())
}

pub async fn fetch_grading_periods<'e, E>(
    db: E,
    course_id: CourseId,
) -> Result<Vec<GradingPeriod>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, GradingPeriodRow>(
        "SELECT id, title, start_date, end_date, is_closed FROM grading_periods WHERE course_id = ? ORDER BY id",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| GradingPeriod {
            id: row.id,
            title: row.title,
            start_date: row.start_date,
            end_date: row.end_date,
            is_closed: row.is_closed,
        })
        .collect())
}

pub async fn upsert_term(conn: &mut SqliteConnection, term: &Term) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO terms (id, name, start_at, end_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            start_at = excluded.start_at,
            end_at = excluded.end_at
        "#,
    )
    .bind(term.id)
    .bind(&term.name)
    .bind(term.start_at)
    .bind(term.end_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upserts the course row only. `ON CONFLICT DO UPDATE` keeps the row (and so its
/// cascading children) in place, unlike `INSERT OR REPLACE`.
pub async fn upsert_course(
    conn: &mut SqliteConnection,
    course: &Course,
    updated_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO courses
            (id, name, course_code, enrollment_state, enrollment_role, term_id, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            course_code = excluded.course_code,
            enrollment_state = excluded.enrollment_state,
            enrollment_role = excluded.enrollment_role,
            term_id = excluded.term_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(course.id)
    .bind(&course.name)
    .bind(&course.course_code)
    .bind(course.enrollment_state.map(|s| s.as_str()))
    .bind(course.enrollment_role.map(|r| r.as_str()))
    .bind(course.term.as_ref().map(|t| t.id))
    .bind(updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn replace_sections(
    conn: &mut SqliteConnection,
    course_id: CourseId,
    sections: &[Section],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sections WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    for section in sections {
        sqlx::query(
            r#"
            INSERT INTO sections (id, course_id, name, start_at, end_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                name = excluded.name,
                start_at = excluded.start_at,
                end_at = excluded.end_at
            "#,
        )
        .bind(section.id)
        .bind(course_id)
        .bind(&section.name)
        .bind(section.start_at)
        .bind(section.end_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn replace_enrollments(
    conn: &mut SqliteConnection,
    course_id: CourseId,
    enrollments: &[Enrollment],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM enrollments WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    for enrollment in enrollments {
        let grades = enrollment.grades.as_ref();
        sqlx::query(
            r#"
            INSERT INTO enrollments
                (id, course_id, user_id, role, enrollment_state, course_section_id,
                current_score, final_score, current_grade, final_grade)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                user_id = excluded.user_id,
                role = excluded.role,
                enrollment_state = excluded.enrollment_state,
                course_section_id = excluded.course_section_id,
                current_score = excluded.current_score,
                final_score = excluded.final_score,
                current_grade = excluded.current_grade,
                final_grade = excluded.final_grade
            "#,
        )
        .bind(enrollment.id)
        .bind(course_id)
        .bind(enrollment.user_id)
        .bind(enrollment.role.as_str())
        .bind(enrollment.enrollment_state.as_str())
        .bind(enrollment.course_section_id)
        .bind(grades.and_then(|g| g.current_score))
        .bind(grades.and_then(|g| g.final_score))
        .bind(grades.and_then(|g| g.current_grade.clone()))
        .bind(grades.and_then(|g| g.final_grade.clone()))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn replace_tabs(
    conn: &mut SqliteConnection,
    course_id: CourseId,
    tabs: &[Tab],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tabs WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    for tab in tabs {
        sqlx::query(
            r#"
            INSERT INTO tabs (course_id, id, label, position, hidden, visibility)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(course_id, id) DO UPDATE SET
                label = excluded.label,
                position = excluded.position,
                hidden = excluded.hidden,
                visibility = excluded.visibility
            "#,
        )
        .bind(course_id)
        .bind(&tab.id)
        .bind(&tab.label)
        .bind(tab.position)
        .bind(tab.hidden)
        .bind(&tab.visibility)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn replace_grading_periods(
    conn: &mut SqliteConnection,
    course_id: CourseId,
    periods: &[GradingPeriod],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM grading_periods WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    for period in periods {
        sqlx::query(
            r#"
            INSERT INTO grading_periods (course_id, id, title, start_date, end_date, is_closed)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(course_id, id) DO UPDATE SET
                title = excluded.title,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                is_closed = excluded.is_closed
            "#,
        )
        .bind(course_id)
        .bind(period.id)
        .bind(&period.title)
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.is_closed)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn upsert_sync_metadata(
    conn: &mut SqliteConnection,
    course_id: CourseId,
    synced_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sync_metadata (course_id, last_synced_at)
        VALUES (?, ?)
        ON CONFLICT(course_id) DO UPDATE SET last_synced_at = excluded.last_synced_at
        "#,
    )
    .bind(course_id)
    .bind(synced_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes the course and every child collection it carries, replacing what was
/// stored for it before. Callers wrap this in a transaction.
pub async fn save_course_graph(
    conn: &mut SqliteConnection,
    course: &Course,
    synced_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    if let Some(term) = &course.term {
        upsert_term(conn, term).await?;
    }
    upsert_course(conn, course, synced_at).await?;
    replace_sections(conn, course.id, &course.sections).await?;
    replace_tabs(conn, course.id, &course.tabs).await?;
    replace_enrollments(conn, course.id, &course.enrollments).await?;
    replace_grading_periods(conn, course.id, &course.grading_periods).await?;
    upsert_sync_metadata(conn, course.id, synced_at).await?;

    Ok(())
}

pub async fn find_sync_metadata(
    db: &SqlitePool,
    course_id: CourseId,
) -> Result<Option<SyncMetadata>, sqlx::Error> {
    let row: Option<(CourseId, DateTime<Utc>)> =
        sqlx::query_as("SELECT course_id, last_synced_at FROM sync_metadata WHERE course_id = ?")
            .bind(course_id)
            .fetch_optional(db)
            .await?;

    Ok(row.map(|(course_id, last_synced_at)| SyncMetadata {
        course_id,
        last_synced_at,
    }))
}

pub async fn find_sync_settings(
    db: &SqlitePool,
    course_id: CourseId,
) -> Result<Option<CourseSyncSettings>, sqlx::Error> {
    sqlx::query_as::<_, SyncSettingsRow>(
        "SELECT course_id, enabled, tabs FROM course_sync_settings WHERE course_id = ?",
    )
    .bind(course_id)
    .fetch_optional(db)
    .await?
    .map(SyncSettingsRow::into_settings)
    .transpose()
}

pub async fn fetch_enabled_sync_settings(
    db: &SqlitePool,
) -> Result<Vec<CourseSyncSettings>, sqlx::Error> {
    sqlx::query_as::<_, SyncSettingsRow>(
        "SELECT course_id, enabled, tabs FROM course_sync_settings WHERE enabled = 1 ORDER BY course_id",
    )
    .fetch_all(db)
    .await?
    .into_iter()
    .map(SyncSettingsRow::into_settings)
    .collect()
}

pub async fn upsert_sync_settings(
    db: &SqlitePool,
    settings: &CourseSyncSettings,
) -> Result<(), sqlx::Error> {
    let tabs = serde_json::to_string(&settings.tabs).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO course_sync_settings (course_id, enabled, tabs)
        VALUES (?, ?, ?)
        ON CONFLICT(course_id) DO UPDATE SET
            enabled = excluded.enabled,
            tabs = excluded.tabs
        "#,
    )
    .bind(settings.course_id)
    .bind(settings.enabled)
    .bind(tabs)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_sync_progress(
    db: &SqlitePool,
    course_id: CourseId,
) -> Result<Option<SyncProgress>, sqlx::Error> {
    sqlx::query_as::<_, SyncProgressRow>(
        r#"
        SELECT course_id, run_id, state, stages, started_at, finished_at, error
        FROM course_sync_progress
        WHERE course_id = ?
        "#,
    )
    .bind(course_id)
    .fetch_optional(db)
    .await?
    .map(SyncProgressRow::into_progress)
    .transpose()
}

pub async fn upsert_sync_progress(
    db: &SqlitePool,
    progress: &SyncProgress,
) -> Result<(), sqlx::Error> {
    let stages =
        serde_json::to_string(&progress.stages).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO course_sync_progress
            (course_id, run_id, state, stages, started_at, finished_at, error)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(course_id) DO UPDATE SET
            run_id = excluded.run_id,
            state = excluded.state,
            stages = excluded.stages,
            started_at = excluded.started_at,
            finished_at = excluded.finished_at,
            error = excluded.error
        "#,
    )
    .bind(progress.course_id)
    .bind(&progress.run_id)
    .bind(progress.state.as_str())
    .bind(stages)
    .bind(progress.started_at)
    .bind(progress.finished_at)
    .bind(&progress.error)
    .execute(db)
    .await?;

    Ok(())
}

/// Empties every local table, as on logout.
pub async fn clear_all(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;

    for table in [
        "enrollments",
        "sections",
        "tabs",
        "grading_periods",
        "sync_metadata",
        "courses",
        "terms",
        "course_sync_settings",
        "course_sync_progress",
    ] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::models::StageState;
    use crate::models::SyncStage;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn sample_course(id: i64) -> Course {
        let course_id = CourseId(id);
        Course {
            id: course_id,
            name: "Biology 101".to_string(),
            course_code: Some("BIO101".to_string()),
            enrollment_state: Some(EnrollmentState::Active),
            enrollment_role: Some(EnrollmentRole::Student),
            term: Some(Term {
                id: 3,
                name: "Fall 2024".to_string(),
                start_at: Some(Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()),
                end_at: None,
            }),
            sections: vec![Section {
                id: 70,
                course_id,
                name: "Section A".to_string(),
                start_at: None,
                end_at: None,
            }],
            tabs: vec![Tab {
                id: Tab::GRADES.to_string(),
                label: "Grades".to_string(),
                position: 2,
                hidden: false,
                visibility: Some("public".to_string()),
            }],
            enrollments: vec![Enrollment {
                id: 900,
                course_id,
                user_id: UserId(5),
                role: EnrollmentRole::Student,
                enrollment_state: EnrollmentState::Active,
                course_section_id: Some(70),
                grades: Some(Grades {
                    current_score: Some(91.5),
                    final_score: Some(88.0),
                    current_grade: Some("A-".to_string()),
                    final_grade: None,
                }),
            }],
            grading_periods: vec![GradingPeriod {
                id: 11,
                title: "Q1".to_string(),
                start_date: None,
                end_date: None,
                is_closed: true,
            }],
        }
    }

    async fn save(pool: &SqlitePool, course: &Course) {
        let mut tx = pool.begin().await.expect("begin");
        save_course_graph(&mut tx, course, Utc::now())
            .await
            .expect("Failed to save course graph");
        tx.commit().await.expect("commit");
    }

    #[tokio::test]
    async fn test_save_and_fetch_course_graph() {
        let pool = setup_test_db().await;
        let course = sample_course(42);

        save(&pool, &course).await;

        let stored = find_course_by_id(&pool, CourseId(42))
            .await
            .expect("Failed to fetch course")
            .expect("Course not found");
        assert_eq!(stored, course.summary());

        assert_eq!(fetch_sections(&pool, CourseId(42)).await.unwrap(), course.sections);
        assert_eq!(fetch_tabs(&pool, CourseId(42)).await.unwrap(), course.tabs);
        assert_eq!(fetch_enrollments(&pool, CourseId(42)).await.unwrap(), course.enrollments);
        assert_eq!(
            fetch_grading_periods(&pool, CourseId(42)).await.unwrap(),
            course.grading_periods
        );
        assert!(find_sync_metadata(&pool, CourseId(42)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resave_replaces_children() {
        let pool = setup_test_db().await;
        let mut course = sample_course(42);
        save(&pool, &course).await;

        course.name = "Biology 102".to_string();
        course.enrollments.clear();
        course.sections[0].name = "Section B".to_string();
        save(&pool, &course).await;

        let stored = find_course_by_id(&pool, CourseId(42)).await.unwrap().unwrap();
        assert_eq!(stored.name, "Biology 102");
        assert!(fetch_enrollments(&pool, CourseId(42)).await.unwrap().is_empty());
        assert_eq!(fetch_sections(&pool, CourseId(42)).await.unwrap()[0].name, "Section B");
        assert_eq!(fetch_courses(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_rows_read_as_empty() {
        let pool = setup_test_db().await;

        assert!(find_course_by_id(&pool, CourseId(1)).await.unwrap().is_none());
        assert!(fetch_sections(&pool, CourseId(1)).await.unwrap().is_empty());
        assert!(fetch_enrollments(&pool, CourseId(1)).await.unwrap().is_empty());
        assert!(find_sync_settings(&pool, CourseId(1)).await.unwrap().is_none());
        assert!(find_sync_progress(&pool, CourseId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_settings_round_trip() {
        let pool = setup_test_db().await;
        let enabled = CourseSyncSettings::all(CourseId(1));
        let disabled = CourseSyncSettings {
            course_id: CourseId(2),
            enabled: false,
            tabs: BTreeSet::new(),
        };

        upsert_sync_settings(&pool, &enabled).await.unwrap();
        upsert_sync_settings(&pool, &disabled).await.unwrap();

        assert_eq!(
            find_sync_settings(&pool, CourseId(1)).await.unwrap(),
            Some(enabled.clone())
        );
        assert_eq!(fetch_enabled_sync_settings(&pool).await.unwrap(), vec![enabled]);
    }

    #[tokio::test]
    async fn test_sync_progress_round_trip() {
        let pool = setup_test_db().await;
        let mut progress = SyncProgress::start(CourseId(42), &[SyncStage::Course, SyncStage::Tabs]);
        upsert_sync_progress(&pool, &progress).await.unwrap();

        progress.set_stage(SyncStage::Course, StageState::Completed);
        progress.complete();
        upsert_sync_progress(&pool, &progress).await.unwrap();

        let stored = find_sync_progress(&pool, CourseId(42)).await.unwrap().unwrap();
        assert_eq!(stored.state, SyncState::Completed);
        assert_eq!(stored.stage(SyncStage::Course), Some(StageState::Completed));
        assert_eq!(stored.run_id, progress.run_id);
    }

    #[tokio::test]
    async fn test_clear_all_empties_every_table() {
        let pool = setup_test_db().await;
        save(&pool, &sample_course(42)).await;
        upsert_sync_settings(&pool, &CourseSyncSettings::all(CourseId(42)))
            .await
            .unwrap();

        clear_all(&pool).await.expect("Failed to clear");

        assert!(fetch_courses(&pool).await.unwrap().is_empty());
        assert!(fetch_enrollments(&pool, CourseId(42)).await.unwrap().is_empty());
        assert!(find_sync_settings(&pool, CourseId(42)).await.unwrap().is_none());
        assert!(find_sync_metadata(&pool, CourseId(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_migrations_keep_existing_rows() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        let mut first = sqlx::migrate!("./migrations");
        first.migrations = first
            .migrations
            .iter()
            .take(1)
            .cloned()
            .collect::<Vec<_>>()
            .into();
        first.run(&pool).await.expect("Failed to run first migration");

        sqlx::query("INSERT INTO courses (id, name, updated_at) VALUES (42, 'Biology 101', ?)")
            .bind(Utc::now())
            .execute(&pool)
            .await
            .expect("Failed to insert pre-migration course");

        crate::db::MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run remaining migrations");

        let course = find_course_by_id(&pool, CourseId(42))
            .await
            .unwrap()
            .expect("course survived migrations");
        assert_eq!(course.name, "Biology 101");
        assert_eq!(course.course_code, None);
        assert!(fetch_tabs(&pool, CourseId(42)).await.unwrap().is_empty());
    }
}
