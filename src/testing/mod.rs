use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api::CourseBackend;
use crate::error::ClientError;
use crate::models::{Enrollment, EnrollmentStatus, Lesson, Module, Progress};
use crate::types::{CourseId, LessonId};

/// Lesson fixture with a video attached
pub fn lesson(id: &str, order: i64) -> Lesson {
    Lesson {
        id: LessonId::from(id),
        title: format!("Lesson {}", id),
        content: Some(format!("Notes for {}", id)),
        description: None,
        video_url: Some(format!("https://cdn.example.com/{}.mp4", id)),
        thumbnail: None,
        duration: Some(5),
        order,
    }
}

pub fn module(id: &str, order: i64, lessons: Vec<Lesson>) -> Module {
    Module {
        id: id.into(),
        title: format!("Module {}", id),
        description: None,
        order,
        lessons,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Modules,
    Enrollment,
    Enroll,
    Complete,
}

#[derive(Debug, Clone)]
pub enum Failure {
    Network,
    Unauthorized,
    Server(u16, &'static str),
}

impl Failure {
    fn into_error(self) -> ClientError {
        match self {
            Failure::Network => ClientError::Network("connection refused".to_string()),
            Failure::Unauthorized => ClientError::auth("jwt expired"),
            Failure::Server(status, message) => ClientError::server(status, message),
        }
    }
}

#[derive(Default)]
struct ScriptState {
    modules: Vec<Module>,
    enrollment: Option<Enrollment>,
    reported_percentage: Option<f64>,
    failures: HashMap<Call, VecDeque<Failure>>,
    calls: HashMap<Call, usize>,
    completions: Vec<LessonId>,
}

impl ScriptState {
    fn total_lessons(&self) -> u32 {
        self.modules.iter().map(|m| m.lessons.len() as u32).sum()
    }

    fn progress_for(&self, completed: Vec<LessonId>) -> Progress {
        let total = self.total_lessons();
        let count = completed.len() as u32;
        let percentage = self.reported_percentage.unwrap_or_else(|| {
            if total == 0 {
                0.0
            } else {
                (f64::from(count) * 100.0 / f64::from(total)).round()
            }
        });
        Progress {
            completed_lessons: completed,
            completion_percentage: percentage,
            completed_lessons_count: count,
            total_lessons: total,
        }
    }
}

/// In-memory stand-in for the LMS backend with scripted failures
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    pub fn new(modules: Vec<Module>) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().modules = modules;
        backend
    }

    pub fn enrolled(self) -> Self {
        self.enrolled_with(&[])
    }

    pub fn enrolled_with(self, completed: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let completed = completed.iter().map(|id| LessonId::from(*id)).collect();
            let progress = state.progress_for(completed);
            state.enrollment = Some(Enrollment {
                id: Some("enrollment-1".to_string()),
                status: EnrollmentStatus::InProgress,
                progress,
            });
        }
        self
    }

    /// Report exactly this enrollment from the lookup
    pub fn set_enrollment(&self, enrollment: Enrollment) {
        self.state.lock().unwrap().enrollment = Some(enrollment);
    }

    /// Override the percentage the server reports after each completion
    pub fn set_reported_percentage(&self, percentage: f64) {
        self.state.lock().unwrap().reported_percentage = Some(percentage);
    }

    pub fn fail_next(&self, call: Call, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(call)
            .or_default()
            .push_back(failure);
    }

    pub fn calls(&self, call: Call) -> usize {
        self.state.lock().unwrap().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn completions(&self) -> Vec<LessonId> {
        self.state.lock().unwrap().completions.clone()
    }

    fn respond<T>(
        &self,
        call: Call,
        f: impl FnOnce(&mut ScriptState) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(call).or_default() += 1;
        if let Some(failure) = state.failures.get_mut(&call).and_then(|q| q.pop_front()) {
            return Err(failure.into_error());
        }
        f(&mut state)
    }
}

#[async_trait]
impl CourseBackend for ScriptedBackend {
    async fn course_modules(&self, _course: &CourseId) -> Result<Vec<Module>, ClientError> {
        self.respond(Call::Modules, |state| Ok(state.modules.clone()))
    }

    async fn enrollment(&self, _course: &CourseId) -> Result<Enrollment, ClientError> {
        self.respond(Call::Enrollment, |state| {
            state.enrollment.clone().ok_or(ClientError::NotEnrolled)
        })
    }

    async fn enroll(&self, _course: &CourseId) -> Result<Enrollment, ClientError> {
        self.respond(Call::Enroll, |state| {
            if state.enrollment.is_some() {
                return Err(ClientError::server(400, "Already enrolled in this course"));
            }
            let enrollment = Enrollment {
                id: Some("enrollment-1".to_string()),
                status: EnrollmentStatus::InProgress,
                progress: Progress::empty(state.total_lessons()),
            };
            state.enrollment = Some(enrollment.clone());
            Ok(enrollment)
        })
    }

    async fn complete_lesson(
        &self,
        _course: &CourseId,
        lesson: &LessonId,
    ) -> Result<Enrollment, ClientError> {
        self.respond(Call::Complete, |state| {
            let mut completed = match &state.enrollment {
                Some(enrollment) => enrollment.progress.completed_lessons.clone(),
                None => return Err(ClientError::server(404, "Enrollment not found")),
            };
            state.completions.push(lesson.clone());
            if !completed.contains(lesson) {
                completed.push(lesson.clone());
            }

            let progress = state.progress_for(completed);
            let status = if progress.completed_lessons_count == progress.total_lessons {
                EnrollmentStatus::Completed
            } else {
                EnrollmentStatus::InProgress
            };
            let enrollment = Enrollment {
                id: Some("enrollment-1".to_string()),
                status,
                progress,
            };
            state.enrollment = Some(enrollment.clone());
            Ok(enrollment)
        })
    }
}
