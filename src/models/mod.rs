pub mod context;
pub mod course;
pub mod enrollment;
pub mod sync;

pub use context::{CanvasContext, CourseId, GroupId, UserId};
pub use course::{Course, GradingPeriod, Section, Tab, Term};
pub use enrollment::{Enrollment, EnrollmentRole, EnrollmentState, Grades};
pub use sync::{
    CourseSyncSettings, StageProgress, StageState, SyncMetadata, SyncProgress, SyncReport,
    SyncStage, SyncState,
};
