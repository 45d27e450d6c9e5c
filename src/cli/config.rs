use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::api::ApiClient;
use crate::config::config;
use crate::session::{FileSessionStore, Session, SessionError};

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = match &config().session.config_dir {
        Some(dir) => dir.clone(),
        None => {
            let home = std::env::var("HOME").map_err(|_| SessionError::NoHome)?;
            PathBuf::from(home).join(".config").join("lms").join("cli")
        }
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("failed to create {}", config_dir.display()))?;
    }

    Ok(config_dir)
}

/// Session persisted under the CLI configuration directory
pub fn open_session() -> anyhow::Result<Session> {
    let store = FileSessionStore::in_dir(&get_config_dir()?);
    let path = store.path().display().to_string();
    Session::open(Arc::new(store)).with_context(|| format!("failed to read session from {}", path))
}

/// API client carrying the session's token
pub fn api_client(session: &Session) -> anyhow::Result<ApiClient> {
    ApiClient::for_session(&config().api, session).context("failed to build API client")
}
