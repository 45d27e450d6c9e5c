//! Course content viewer: module/lesson navigation and completion tracking.
//!
//! The viewer moves through three phases:
//!
//! ```text
//! NotEnrolled --enroll--> EnrolledNoSelection --auto-select--> Viewing(cursor)
//! ```
//!
//! Inside `Viewing`, selection and next/previous move the cursor while
//! completing a lesson only touches completion data. Every network-backed
//! transition commits local state only after the server confirms it; a
//! failure leaves state as it was and records a [`Notice`].

mod notice;
mod outline;
mod timer;

pub use notice::{Notice, NoticeKind};
pub use outline::{Cursor, Outline};
pub use timer::{CompletionTimer, TimerFired};

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::api::CourseBackend;
use crate::config::ViewerConfig;
use crate::error::ClientError;
use crate::models::{Enrollment, Lesson, Module, Progress};
use crate::types::{CourseId, LessonId, ModuleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    NotEnrolled,
    EnrolledNoSelection,
    Viewing(Cursor),
}

impl ViewPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ViewPhase::NotEnrolled => "not_enrolled",
            ViewPhase::EnrolledNoSelection => "enrolled_no_selection",
            ViewPhase::Viewing(_) => "enrolled_viewing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("course content has not been loaded")]
    NotLoaded,

    #[error("enroll in the course to view its content")]
    NotEnrolled,

    #[error("no module selected")]
    NoModuleSelected,

    #[error("module '{0}' is not part of this course")]
    UnknownModule(String),

    #[error("lesson '{0}' is not in the selected module")]
    NotInModule(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed,
    AlreadyCompleted,
    NotEnrolled,
    UnknownLesson,
    Failed(Notice),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Enrolled,
    AlreadyEnrolled,
    /// No successful load yet; enrolling now would land on an empty outline
    NotLoaded,
    Failed(Notice),
}

/// Serializable view of the viewer for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ViewerSnapshot {
    pub course_id: CourseId,
    pub state: &'static str,
    pub module_id: Option<ModuleId>,
    pub module_title: Option<String>,
    pub lesson_id: Option<LessonId>,
    pub lesson_title: Option<String>,
    pub progress: Option<Progress>,
    pub watched: Vec<LessonId>,
    pub timer_armed_for: Option<LessonId>,
    pub notice: Option<Notice>,
}

pub struct CourseViewer<B> {
    backend: B,
    course_id: CourseId,
    outline: Outline,
    phase: ViewPhase,
    enrollment: Option<Enrollment>,
    watched: BTreeSet<LessonId>,
    notice: Option<Notice>,
    timer: CompletionTimer,
    loaded: bool,
}

impl<B: CourseBackend> CourseViewer<B> {
    pub fn new(backend: B, course_id: CourseId, config: &ViewerConfig) -> Self {
        Self {
            backend,
            course_id,
            outline: Outline::default(),
            phase: ViewPhase::NotEnrolled,
            enrollment: None,
            watched: BTreeSet::new(),
            notice: None,
            timer: CompletionTimer::new(config.completion_threshold()),
            loaded: false,
        }
    }

    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_enrolled(&self) -> bool {
        !matches!(self.phase, ViewPhase::NotEnrolled)
    }

    pub fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    /// Progress exactly as last reported by the server
    pub fn progress(&self) -> Option<&Progress> {
        self.enrollment.as_ref().map(|e| &e.progress)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn cursor(&self) -> Option<Cursor> {
        match self.phase {
            ViewPhase::Viewing(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn selected_module(&self) -> Option<&Module> {
        self.cursor().and_then(|c| self.outline.module(c.module))
    }

    pub fn selected_lesson(&self) -> Option<&Lesson> {
        self.cursor().and_then(|c| self.outline.lesson(c))
    }

    pub fn is_watched(&self, lesson: &LessonId) -> bool {
        self.watched.contains(lesson)
    }

    pub fn armed_lesson(&self) -> Option<&LessonId> {
        self.timer.armed_lesson()
    }

    /// Fetch the module tree and the enrollment. Safe to call again after a
    /// failure; on success the current lesson is kept if it still exists.
    pub async fn load(&mut self) -> Result<(), Notice> {
        let keep = self.selected_lesson().map(|l| l.id.clone());

        let (modules, enrollment) = tokio::join!(
            self.backend.course_modules(&self.course_id),
            self.backend.enrollment(&self.course_id),
        );

        let modules = match modules {
            Ok(modules) => modules,
            Err(e) => return Err(self.record_failure("load modules", &e)),
        };
        let enrollment = match enrollment {
            Ok(enrollment) => Some(enrollment),
            Err(ClientError::NotEnrolled) => None,
            Err(e) => return Err(self.record_failure("load enrollment", &e)),
        };

        self.timer.cancel();
        self.outline = Outline::new(modules);
        match enrollment {
            Some(enrollment) => self.accept_enrollment(enrollment, keep),
            None => {
                self.enrollment = None;
                self.watched.clear();
                self.phase = ViewPhase::NotEnrolled;
            }
        }

        self.loaded = true;
        self.notice = None;
        tracing::info!(
            course = %self.course_id,
            modules = self.outline.modules().len(),
            lessons = self.outline.lesson_count(),
            state = self.phase.label(),
            "course content loaded"
        );
        Ok(())
    }

    pub async fn enroll(&mut self) -> EnrollOutcome {
        if !self.loaded {
            return EnrollOutcome::NotLoaded;
        }
        if self.is_enrolled() {
            return EnrollOutcome::AlreadyEnrolled;
        }

        match self.backend.enroll(&self.course_id).await {
            Ok(enrollment) => {
                tracing::info!(course = %self.course_id, "enrolled");
                self.accept_enrollment(enrollment, None);
                self.notice = None;
                EnrollOutcome::Enrolled
            }
            Err(e) => EnrollOutcome::Failed(self.record_failure("enroll", &e)),
        }
    }

    pub fn select_module(&mut self, id: &ModuleId) -> Result<(), NavigationError> {
        let index = self
            .outline
            .module_index(id)
            .ok_or_else(|| NavigationError::UnknownModule(id.to_string()))?;
        self.select_module_at(index)
    }

    /// Enter the module at `index`, selecting its first lesson if any
    pub fn select_module_at(&mut self, index: usize) -> Result<(), NavigationError> {
        self.ensure_enrolled()?;
        let cursor = self
            .outline
            .enter(index)
            .ok_or_else(|| NavigationError::UnknownModule(format!("#{}", index + 1)))?;
        self.move_to(cursor);
        Ok(())
    }

    pub fn select_lesson(&mut self, id: &LessonId) -> Result<(), NavigationError> {
        self.ensure_enrolled()?;
        let current = self.cursor().ok_or(NavigationError::NoModuleSelected)?;
        match self.outline.locate(id) {
            Some(target) if target.module == current.module => {
                self.move_to(target);
                Ok(())
            }
            _ => Err(NavigationError::NotInModule(id.to_string())),
        }
    }

    /// Select the lesson at `index` within the selected module
    pub fn select_lesson_at(&mut self, index: usize) -> Result<(), NavigationError> {
        self.ensure_enrolled()?;
        let current = self.cursor().ok_or(NavigationError::NoModuleSelected)?;
        let id = self
            .outline
            .module(current.module)
            .and_then(|m| m.lessons.get(index))
            .map(|l| l.id.clone())
            .ok_or_else(|| NavigationError::NotInModule(format!("#{}", index + 1)))?;
        self.select_lesson(&id)
    }

    /// Step forward. `Ok(false)` at the end of the course.
    pub fn next(&mut self) -> Result<bool, NavigationError> {
        self.step(Outline::next)
    }

    /// Step back. `Ok(false)` at the start of the course.
    pub fn previous(&mut self) -> Result<bool, NavigationError> {
        self.step(Outline::previous)
    }

    fn step(&mut self, f: fn(&Outline, Cursor) -> Option<Cursor>) -> Result<bool, NavigationError> {
        self.ensure_enrolled()?;
        let Some(current) = self.cursor() else {
            return Ok(false);
        };
        match f(&self.outline, current) {
            Some(target) => {
                self.move_to(target);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn complete_selected(&mut self) -> CompletionOutcome {
        match self.selected_lesson().map(|l| l.id.clone()) {
            Some(lesson) => self.complete_lesson(&lesson).await,
            None if self.is_enrolled() => CompletionOutcome::UnknownLesson,
            None => CompletionOutcome::NotEnrolled,
        }
    }

    /// Mark a lesson complete. Already-watched lessons are answered locally
    /// without a call; the watched set and enrollment change only when the
    /// server confirms.
    pub async fn complete_lesson(&mut self, lesson: &LessonId) -> CompletionOutcome {
        if !self.is_enrolled() {
            return CompletionOutcome::NotEnrolled;
        }
        if self.outline.locate(lesson).is_none() {
            return CompletionOutcome::UnknownLesson;
        }
        if self.watched.contains(lesson) {
            return CompletionOutcome::AlreadyCompleted;
        }

        match self.backend.complete_lesson(&self.course_id, lesson).await {
            Ok(enrollment) => {
                if self.timer.armed_lesson() == Some(lesson) {
                    self.timer.cancel();
                }
                self.watched
                    .extend(enrollment.progress.completed_lessons.iter().cloned());
                self.watched.insert(lesson.clone());
                tracing::info!(
                    course = %self.course_id,
                    %lesson,
                    percentage = enrollment.progress.completion_percentage,
                    "lesson completed"
                );
                self.enrollment = Some(enrollment);
                self.notice = None;
                CompletionOutcome::Completed
            }
            Err(e) => CompletionOutcome::Failed(self.record_failure("complete lesson", &e)),
        }
    }

    /// Video started playing. Arms the completion timer when the selected
    /// lesson has a video and is not yet watched; returns whether it did.
    ///
    /// Must be called from within a Tokio runtime: arming spawns the
    /// countdown task.
    pub fn play(&mut self) -> bool {
        if !self.is_enrolled() {
            return false;
        }
        let Some(lesson) = self.selected_lesson() else {
            return false;
        };
        if !lesson.has_video() || self.watched.contains(&lesson.id) {
            return false;
        }

        let id = lesson.id.clone();
        self.timer.arm(id);
        true
    }

    /// Playback stopped; continuous play has to start over
    pub fn pause(&mut self) {
        self.timer.cancel();
    }

    /// Wait for the completion timer. Pending while nothing is armed.
    pub async fn next_timer_fire(&mut self) -> TimerFired {
        self.timer.fired().await
    }

    /// Act on a timer fire; `None` if it no longer applies
    pub async fn handle_timer_fire(&mut self, fired: TimerFired) -> Option<CompletionOutcome> {
        if !self.timer.accept(&fired) {
            tracing::debug!(lesson = %fired.lesson, "discarding stale completion timer");
            return None;
        }
        if self.selected_lesson().map(|l| &l.id) != Some(&fired.lesson) {
            tracing::warn!(lesson = %fired.lesson, "completion timer fired for a lesson no longer selected");
            return None;
        }
        if self.watched.contains(&fired.lesson) {
            return None;
        }

        Some(self.complete_lesson(&fired.lesson).await)
    }

    pub async fn run_timer(&mut self) -> Option<CompletionOutcome> {
        let fired = self.next_timer_fire().await;
        self.handle_timer_fire(fired).await
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        let module = self.selected_module();
        let lesson = self.selected_lesson();

        ViewerSnapshot {
            course_id: self.course_id.clone(),
            state: self.phase.label(),
            module_id: module.map(|m| m.id.clone()),
            module_title: module.map(|m| m.title.clone()),
            lesson_id: lesson.map(|l| l.id.clone()),
            lesson_title: lesson.map(|l| l.title.clone()),
            progress: self.progress().cloned(),
            watched: self.watched.iter().cloned().collect(),
            timer_armed_for: self.timer.armed_lesson().cloned(),
            notice: self.notice.clone(),
        }
    }

    fn ensure_enrolled(&self) -> Result<(), NavigationError> {
        if !self.loaded {
            Err(NavigationError::NotLoaded)
        } else if self.is_enrolled() {
            Ok(())
        } else {
            Err(NavigationError::NotEnrolled)
        }
    }

    fn move_to(&mut self, cursor: Cursor) {
        self.timer.cancel();
        self.phase = ViewPhase::Viewing(cursor);
        tracing::debug!(
            module = cursor.module,
            lesson = ?cursor.lesson,
            "selection changed"
        );
    }

    fn accept_enrollment(&mut self, enrollment: Enrollment, keep: Option<LessonId>) {
        self.watched = enrollment.progress.completed_lessons.iter().cloned().collect();
        self.enrollment = Some(enrollment);
        self.phase = ViewPhase::EnrolledNoSelection;

        let cursor = keep
            .and_then(|id| self.outline.locate(&id))
            .or_else(|| self.outline.first());
        if let Some(cursor) = cursor {
            self.move_to(cursor);
        }
    }

    fn record_failure(&mut self, action: &str, err: &ClientError) -> Notice {
        tracing::warn!(course = %self.course_id, action, error = %err, "viewer call failed");
        let notice = Notice::from(err);
        self.notice = Some(notice.clone());
        notice
    }
}
