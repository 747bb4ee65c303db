use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("not logged in")]
    NotAuthenticated,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    user_id: String,
}

#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    user_id: Option<String>,
}

impl Session {
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let user_id = match fs::read_to_string(&path) {
            Ok(raw) => {
                let stored: StoredSession =
                    serde_json::from_str(&raw).map_err(|source| SessionError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                Some(stored.user_id).filter(|id| !id.trim().is_empty())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        debug!("Session from {}: {:?}", path.display(), user_id);
        Ok(Self { path, user_id })
    }

    pub fn login(&mut self, user_id: impl Into<String>) -> Result<(), SessionError> {
        let user_id = user_id.into();
        let stored = StoredSession {
            user_id: user_id.clone(),
        };
        let raw = serde_json::to_string(&stored).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, raw).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!("Logged in as {user_id}");
        self.user_id = Some(user_id);
        Ok(())
    }

    pub fn teardown(&mut self) -> Result<(), SessionError> {
        self.user_id = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn require(&self) -> Result<&str, SessionError> {
        self.user_id().ok_or(SessionError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_persists_until_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = Session::init(&path).unwrap();
        assert_eq!(session.user_id(), None);
        assert!(matches!(session.require(), Err(SessionError::NotAuthenticated)));

        session.login("42").unwrap();
        let restored = Session::init(&path).unwrap();
        assert_eq!(restored.user_id(), Some("42"));

        session.teardown().unwrap();
        assert_eq!(session.user_id(), None);
        assert_eq!(Session::init(&path).unwrap().user_id(), None);
        // tearing down twice is fine
        session.teardown().unwrap();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Session::init(&path), Err(SessionError::Corrupt { .. })));
    }
}
