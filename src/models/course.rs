use serde::{Deserialize, Serialize};

use crate::types::{CourseId, LessonId, ModuleId};

const NO_LESSON_BODY: &str = "No description is available for this lesson.";

/// Atomic content unit: a video and/or text body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Length in minutes
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub order: i64,
}

impl Lesson {
    /// Text shown under the player: content, then description, then a placeholder
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.description.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(NO_LESSON_BODY)
    }

    pub fn has_video(&self) -> bool {
        self.video_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Ordered grouping of lessons within a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "_id")]
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub average: f64,
}

/// Course summary as served by `GET /courses/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub teacher: Option<TeacherRef>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Course {
    pub fn teacher_name(&self) -> &str {
        self.teacher
            .as_ref()
            .and_then(|t| t.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn rating_average(&self) -> f64 {
        self.rating.as_ref().map(|r| r.average).unwrap_or(0.0)
    }
}
