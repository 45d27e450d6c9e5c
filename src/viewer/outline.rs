use crate::models::{Lesson, Module};
use crate::types::{LessonId, ModuleId};

/// Selected position in an [`Outline`]. `lesson` is `None` when the module
/// has no lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub module: usize,
    pub lesson: Option<usize>,
}

impl Cursor {
    pub fn at(module: usize, lesson: usize) -> Self {
        Self {
            module,
            lesson: Some(lesson),
        }
    }

    pub fn module_only(module: usize) -> Self {
        Self {
            module,
            lesson: None,
        }
    }
}

/// Course tree in navigation order: modules by `order`, lessons by `order`
/// within each module. Ties keep the order the server sent.
///
/// Stepping with [`Outline::next`] and [`Outline::previous`] skips modules
/// that have no lessons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    modules: Vec<Module>,
}

impl Outline {
    pub fn new(mut modules: Vec<Module>) -> Self {
        modules.sort_by_key(|m| m.order);
        for module in &mut modules {
            module.lessons.sort_by_key(|l| l.order);
        }
        Self { modules }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub fn lesson(&self, cursor: Cursor) -> Option<&Lesson> {
        let lesson = cursor.lesson?;
        self.modules.get(cursor.module)?.lessons.get(lesson)
    }

    pub fn module_index(&self, id: &ModuleId) -> Option<usize> {
        self.modules.iter().position(|m| &m.id == id)
    }

    /// Cursor of the lesson with this id, wherever it lives
    pub fn locate(&self, id: &LessonId) -> Option<Cursor> {
        self.modules.iter().enumerate().find_map(|(m, module)| {
            module
                .lessons
                .iter()
                .position(|l| &l.id == id)
                .map(|l| Cursor::at(m, l))
        })
    }

    /// Cursor after entering a module: its first lesson, or none if empty
    pub fn enter(&self, module: usize) -> Option<Cursor> {
        let m = self.modules.get(module)?;
        Some(if m.is_empty() {
            Cursor::module_only(module)
        } else {
            Cursor::at(module, 0)
        })
    }

    /// Where a fresh viewer lands: the first lesson of the first non-empty
    /// module, else the first module with nothing selected.
    pub fn first(&self) -> Option<Cursor> {
        self.first_lesson_from(0).or_else(|| self.enter(0))
    }

    /// Next position, or `None` at the end of the course
    pub fn next(&self, at: Cursor) -> Option<Cursor> {
        let module = self.modules.get(at.module)?;
        if let Some(lesson) = at.lesson {
            if lesson + 1 < module.lessons.len() {
                return Some(Cursor::at(at.module, lesson + 1));
            }
        }
        self.first_lesson_from(at.module + 1)
    }

    /// Previous position, or `None` at the start of the course
    pub fn previous(&self, at: Cursor) -> Option<Cursor> {
        self.modules.get(at.module)?;
        if let Some(lesson) = at.lesson {
            if lesson > 0 {
                return Some(Cursor::at(at.module, lesson - 1));
            }
        }
        self.last_lesson_before(at.module)
    }

    fn first_lesson_from(&self, start: usize) -> Option<Cursor> {
        self.modules
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, m)| !m.is_empty())
            .map(|(m, _)| Cursor::at(m, 0))
    }

    fn last_lesson_before(&self, end: usize) -> Option<Cursor> {
        self.modules[..end.min(self.modules.len())]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| !m.is_empty())
            .map(|(m, module)| Cursor::at(m, module.lessons.len() - 1))
    }
}
