use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::CourseId;
use super::course::Tab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
    Completed,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "syncing" => SyncState::Syncing,
            "completed" => SyncState::Completed,
            "failed" => SyncState::Failed,
            _ => SyncState::Idle,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Failed)
    }
}

/// One nested collection fetched during a course sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Course,
    Sections,
    Tabs,
    Enrollments,
    GradingPeriods,
}

impl SyncStage {
    pub const ALL: [SyncStage; 5] = [
        SyncStage::Course,
        SyncStage::Sections,
        SyncStage::Tabs,
        SyncStage::Enrollments,
        SyncStage::GradingPeriods,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Course => "course",
            SyncStage::Sections => "sections",
            SyncStage::Tabs => "tabs",
            SyncStage::Enrollments => "enrollments",
            SyncStage::GradingPeriods => "grading_periods",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Starting,
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: SyncStage,
    pub state: StageState,
}

/// Persisted progress of the latest sync run of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub course_id: CourseId,
    pub run_id: String,
    pub state: SyncState,
    pub stages: Vec<StageProgress>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SyncProgress {
    pub fn start(course_id: CourseId, stages: &[SyncStage]) -> Self {
        Self {
            course_id,
            run_id: Uuid::new_v4().to_string(),
            state: SyncState::Syncing,
            stages: stages
                .iter()
                .map(|stage| StageProgress {
                    stage: *stage,
                    state: StageState::Starting,
                })
                .collect(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn set_stage(&mut self, stage: SyncStage, state: StageState) {
        if let Some(progress) = self.stages.iter_mut().find(|p| p.stage == stage) {
            progress.state = state;
        }
    }

    pub fn stage(&self, stage: SyncStage) -> Option<StageState> {
        self.stages.iter().find(|p| p.stage == stage).map(|p| p.state)
    }

    pub fn complete(&mut self) {
        self.state = SyncState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = SyncState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
    }
}

/// Marker of the last successful sync of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub course_id: CourseId,
    pub last_synced_at: DateTime<Utc>,
}

impl SyncMetadata {
    pub fn needs_sync(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_synced_at >= max_age
    }
}

/// Which parts of a course are kept offline.
///
/// A course without stored settings syncs everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSyncSettings {
    pub course_id: CourseId,
    pub enabled: bool,
    pub tabs: BTreeSet<String>,
}

impl CourseSyncSettings {
    pub fn all(course_id: CourseId) -> Self {
        Self {
            course_id,
            enabled: true,
            tabs: [Tab::PEOPLE, Tab::GRADES]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn is_tab_selected(&self, tab_id: &str) -> bool {
        self.tabs.contains(tab_id)
    }

    pub fn is_stage_selected(&self, stage: SyncStage) -> bool {
        match stage {
            SyncStage::Course | SyncStage::Sections | SyncStage::Tabs | SyncStage::Enrollments => {
                true
            }
            SyncStage::GradingPeriods => self.is_tab_selected(Tab::GRADES),
        }
    }

    pub fn selected_stages(&self) -> Vec<SyncStage> {
        SyncStage::ALL
            .into_iter()
            .filter(|stage| self.is_stage_selected(*stage))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub course_id: CourseId,
    pub run_id: String,
    pub sections: usize,
    pub tabs: usize,
    pub enrollments: usize,
    pub grading_periods: usize,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_select_every_stage() {
        let settings = CourseSyncSettings::all(CourseId(1));
        assert_eq!(settings.selected_stages(), SyncStage::ALL.to_vec());
    }

    #[test]
    fn test_people_only_skips_grading_periods() {
        let settings = CourseSyncSettings {
            course_id: CourseId(1),
            enabled: true,
            tabs: [Tab::PEOPLE.to_string()].into_iter().collect(),
        };
        assert!(settings.is_stage_selected(SyncStage::Enrollments));
        assert!(!settings.is_stage_selected(SyncStage::GradingPeriods));
    }

    #[test]
    fn test_no_tabs_keeps_structure_and_enrollments() {
        let settings = CourseSyncSettings {
            course_id: CourseId(1),
            enabled: true,
            tabs: BTreeSet::new(),
        };
        assert_eq!(
            settings.selected_stages(),
            vec![
                SyncStage::Course,
                SyncStage::Sections,
                SyncStage::Tabs,
                SyncStage::Enrollments
            ]
        );
    }

    #[test]
    fn test_progress_transitions() {
        let mut progress = SyncProgress::start(CourseId(9), &[SyncStage::Course, SyncStage::Tabs]);
        assert_eq!(progress.state, SyncState::Syncing);
        assert_eq!(progress.stage(SyncStage::Tabs), Some(StageState::Starting));

        progress.set_stage(SyncStage::Tabs, StageState::Error);
        progress.fail("boom");

        assert_eq!(progress.state, SyncState::Failed);
        assert_eq!(progress.stage(SyncStage::Tabs), Some(StageState::Error));
        assert_eq!(progress.stage(SyncStage::Enrollments), None);
        assert!(progress.finished_at.is_some());
    }

    #[test]
    fn test_metadata_staleness() {
        let now = Utc::now();
        let meta = SyncMetadata {
            course_id: CourseId(1),
            last_synced_at: now - Duration::minutes(30),
        };
        assert!(meta.needs_sync(now, Duration::minutes(15)));
        assert!(!meta.needs_sync(now, Duration::hours(1)));
    }
}
