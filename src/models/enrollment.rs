use serde::{Deserialize, Serialize};

use crate::types::LessonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    #[default]
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Server-owned progress counters. Never recomputed on the client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub completed_lessons: Vec<LessonId>,
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub completed_lessons_count: u32,
    #[serde(default)]
    pub total_lessons: u32,
}

impl Progress {
    /// Fresh progress for a course with `total_lessons` lessons
    pub fn empty(total_lessons: u32) -> Self {
        Self {
            total_lessons,
            ..Self::default()
        }
    }

    pub fn is_untouched(&self) -> bool {
        self.completed_lessons.is_empty() && self.completed_lessons_count == 0
    }

    /// Percentage exactly as the server reported it
    pub fn percentage_label(&self) -> String {
        format!("{}%", self.completion_percentage)
    }

    pub fn count_label(&self) -> String {
        format!("{} / {} lessons", self.completed_lessons_count, self.total_lessons)
    }
}

/// Association between a learner and a course
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub progress: Progress,
}
