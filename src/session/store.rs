use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{SessionData, SessionError};

/// Where session data lives between runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<SessionData, SessionError>;
    fn save(&self, data: &SessionData) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// JSON file under the CLI configuration directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub const FILE_NAME: &'static str = "session.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<SessionData, SessionError> {
        if !self.path.exists() {
            return Ok(SessionData::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let data: SessionData = serde_json::from_str(&content)?;
        Ok(data)
    }

    fn save(&self, data: &SessionData) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "session written");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: Mutex<SessionData>,
}

impl MemorySessionStore {
    fn guard(&self) -> Result<MutexGuard<'_, SessionData>, SessionError> {
        self.data.lock().map_err(|_| SessionError::Poisoned)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<SessionData, SessionError> {
        Ok(self.guard()?.clone())
    }

    fn save(&self, data: &SessionData) -> Result<(), SessionError> {
        *self.guard()? = data.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.guard()? = SessionData::default();
        Ok(())
    }
}
