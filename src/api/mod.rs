//! Typed access to the LMS REST backend.

mod client;
mod envelope;

pub use client::ApiClient;
pub use envelope::Envelope;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::models::{Enrollment, Module};
use crate::types::{CourseId, LessonId};

/// Calls the course viewer depends on.
///
/// `enrollment` must report a learner who is not enrolled as
/// [`ClientError::NotEnrolled`], never as a generic failure.
#[async_trait]
pub trait CourseBackend: Send + Sync {
    async fn course_modules(&self, course: &CourseId) -> Result<Vec<Module>, ClientError>;

    async fn enrollment(&self, course: &CourseId) -> Result<Enrollment, ClientError>;

    async fn enroll(&self, course: &CourseId) -> Result<Enrollment, ClientError>;

    async fn complete_lesson(
        &self,
        course: &CourseId,
        lesson: &LessonId,
    ) -> Result<Enrollment, ClientError>;
}
