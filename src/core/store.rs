//! Store abstraction for gridplan's persisted state.
//!
//! A project keeps its state under `<project>/.gridplan/`: the configuration file
//! at the top and the SQLite stores plus the broker audit log under `data/`.

use crate::core::error;
use std::path::{Path, PathBuf};

pub const PROJECT_DIR_NAME: &str = ".gridplan";
pub const DATA_DIR_NAME: &str = "data";

/// Store handle representing one gridplan state workspace.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory (`.gridplan/data`).
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted inside a project directory.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(PROJECT_DIR_NAME).join(DATA_DIR_NAME))
    }
}

/// Walks up from `start_dir` to the first directory containing `.gridplan/`.
pub fn find_project_root(start_dir: &Path) -> Result<PathBuf, error::GridplanError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(PROJECT_DIR_NAME).exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(error::GridplanError::NotFound(
                "'.gridplan' directory not found in current or parent directories. Run `gridplan init` first.".to_string(),
            ));
        }
    }
}
