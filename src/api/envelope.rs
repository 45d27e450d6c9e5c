use serde::{Deserialize, Serialize};

use crate::models::{Course, Enrollment, Module, UserProfile};

/// Standard response wrapper: `{ success, message, data }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Only an explicit `success: false` marks a failed body
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModulesData {
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentData {
    #[serde(default)]
    pub enrollment: Option<Enrollment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseData {
    pub course: Course,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileData {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

impl ProfileData {
    pub fn into_profile(self) -> UserProfile {
        match self {
            ProfileData::Wrapped { user } => user,
            ProfileData::Bare(user) => user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_without_a_default_may_be_absent() {
        let envelope: Envelope<CourseData> =
            serde_json::from_str(r#"{"success": true, "message": "ok"}"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("ok"));
        assert!(!envelope.is_rejected());

        let envelope: Envelope<CourseData> = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(envelope.is_rejected());
        assert!(envelope.message.is_none());
    }
}
