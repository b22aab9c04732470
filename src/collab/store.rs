use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::analysis::result::AnalysisResult;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid session id '{0}'")]
    InvalidSession(String),

    #[error("store I/O failed for session '{session}': {source}")]
    Io {
        session: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored result for session '{session}' is unreadable: {source}")]
    Json {
        session: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Keeps the most recent result of each session.
pub trait ResultStore: Send {
    fn save(&mut self, session: &str, result: &AnalysisResult) -> Result<(), StoreError>;
    fn load(&self, session: &str) -> Result<Option<AnalysisResult>, StoreError>;
    fn clear(&mut self, session: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: HashMap<String, AnalysisResult>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryResultStore {
    fn save(&mut self, session: &str, result: &AnalysisResult) -> Result<(), StoreError> {
        self.results.insert(session.to_string(), result.clone());
        Ok(())
    }

    fn load(&self, session: &str) -> Result<Option<AnalysisResult>, StoreError> {
        Ok(self.results.get(session).cloned())
    }

    fn clear(&mut self, session: &str) -> Result<(), StoreError> {
        self.results.remove(session);
        Ok(())
    }
}

/// One `<session>.json` file per session under a directory.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: PathBuf,
}

impl FileResultStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, session: &str) -> Result<PathBuf, StoreError> {
        let valid = !session.is_empty()
            && session
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidSession(session.to_string()));
        }
        Ok(self.dir.join(format!("{session}.json")))
    }
}

impl ResultStore for FileResultStore {
    fn save(&mut self, session: &str, result: &AnalysisResult) -> Result<(), StoreError> {
        let path = self.path_for(session)?;
        let io = |source| StoreError::Io {
            session: session.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io)?;
        let json = serde_json::to_string_pretty(result).map_err(|source| StoreError::Json {
            session: session.to_string(),
            source,
        })?;
        fs::write(&path, json).map_err(io)?;
        debug!(path = %path.display(), "result stored");
        Ok(())
    }

    fn load(&self, session: &str) -> Result<Option<AnalysisResult>, StoreError> {
        let path = self.path_for(session)?;
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    session: session.to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Json {
                session: session.to_string(),
                source,
            })
    }

    fn clear(&mut self, session: &str) -> Result<(), StoreError> {
        let path = self.path_for(session)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                session: session.to_string(),
                source,
            }),
        }
    }
}
