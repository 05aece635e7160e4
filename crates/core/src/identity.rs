use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Normalized holder identity (trimmed, upper-cased).
///
/// Built once where names enter the system (schedule file, roster records)
/// so that comparisons elsewhere are plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HolderKey(String);

impl HolderKey {
    pub fn new(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(CoreError::EmptyHolderKey);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HolderKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for HolderKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HolderKey::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// How a holder wants to be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyPreference {
    /// Direct message, falling back to a channel mention at shift start.
    #[default]
    Dm,
    /// Channel mention at shift start only.
    Channel,
    /// Opted out.
    None,
}

impl NotifyPreference {
    pub fn label(&self) -> &'static str {
        match self {
            NotifyPreference::Dm => "DM",
            NotifyPreference::Channel => "Channel",
            NotifyPreference::None => "Off",
        }
    }
}

impl fmt::Display for NotifyPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyPreference::Dm => write!(f, "dm"),
            NotifyPreference::Channel => write!(f, "channel"),
            NotifyPreference::None => write!(f, "none"),
        }
    }
}

impl FromStr for NotifyPreference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dm" => Ok(NotifyPreference::Dm),
            "channel" => Ok(NotifyPreference::Channel),
            "none" | "off" => Ok(NotifyPreference::None),
            other => Err(CoreError::InvalidPreference(other.to_string())),
        }
    }
}
