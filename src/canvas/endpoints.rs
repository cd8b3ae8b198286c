//! Relative API paths, resolved against the configured host by the transport.

use crate::models::{CanvasContext, CourseId};

pub const CURRENT_USER: &str = "api/v1/users/self";

pub fn courses() -> String {
    "api/v1/courses?include[]=term".to_string()
}

pub fn course(course_id: CourseId) -> String {
    format!("api/v1/courses/{}?include[]=term", course_id)
}

pub fn enrollments(course_id: CourseId) -> String {
    context_collection(CanvasContext::Course(course_id), "enrollments")
}

pub fn sections(course_id: CourseId) -> String {
    context_collection(CanvasContext::Course(course_id), "sections")
}

pub fn tabs(course_id: CourseId) -> String {
    context_collection(CanvasContext::Course(course_id), "tabs")
}

pub fn grading_periods(course_id: CourseId) -> String {
    context_collection(CanvasContext::Course(course_id), "grading_periods")
}

fn context_collection(context: CanvasContext, collection: &str) -> String {
    format!("api/v1/{}/{}", context.api_path(), collection)
}
