use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("holder key must not be empty")]
    EmptyHolderKey,

    #[error("unknown notify preference '{0}' (expected dm, channel or none)")]
    InvalidPreference(String),
}
