use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::state::{StateAccess, StoreState};

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the current state, for inspection in tests and reports.
    pub fn snapshot(&self) -> Result<StoreState> {
        self.read(|s| s.clone())
    }
}

impl StateAccess for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> Result<R> {
        let guard = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> Result<R>) -> Result<R> {
        let mut guard = self.state.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut guard)
    }
}
