pub mod course;
pub mod enrollment;
pub mod user;

pub use course::{Course, Lesson, Module};
pub use enrollment::{Enrollment, EnrollmentStatus, Progress};
pub use user::UserProfile;
