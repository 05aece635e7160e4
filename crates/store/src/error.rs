use oncall_core::HolderKey;

/// Errors raised by roster, cursor and settings stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the state lock.
    #[error("store lock poisoned")]
    Poisoned,

    #[error("external id '{external_id}' is already registered to {holder}")]
    DuplicateExternalId {
        external_id: String,
        holder: HolderKey,
    },

    #[error("no roster entry for {0}")]
    NotFound(HolderKey),
}

pub type Result<T> = std::result::Result<T, StoreError>;
