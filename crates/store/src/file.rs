//! JSON-file backed store.
//!
//! The whole [`StoreState`] is one JSON document. Every successful write
//! rewrites it through a temp file and a rename, so a crash leaves either the
//! old or the new document on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::info;

use crate::error::{Result, StoreError};
use crate::state::{StateAccess, StoreState};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    ///
    /// Creates the parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            StoreState::default()
        };

        info!(
            path = %path.display(),
            roster = state.roster.len(),
            settings = state.settings.len(),
            "state file opened"
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".to_string());
        let tmp_path = self.path.with_file_name(format!(".{file_name}.tmp"));

        let json = serde_json::to_string_pretty(state)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl StateAccess for JsonFileStore {
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> Result<R> {
        let guard = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> Result<R>) -> Result<R> {
        let mut guard = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let out = f(&mut guard)?;
        self.persist(&guard)?;
        Ok(out)
    }
}
