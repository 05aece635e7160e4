//! Delivery trait definition and shared error types.

use std::time::Duration;

use oncall_core::HolderKey;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Transport that performs the actual chat-platform send.
///
/// Implementations only move text; routing and fallback policy live in
/// [`Dispatcher`](crate::Dispatcher).
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    /// Private message to a single person.
    async fn send_direct(&self, external_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Post into a shared channel.
    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Inline mention syntax for `external_id`.
    fn mention(&self, external_id: &str) -> String {
        format!("<@{external_id}>")
    }

    /// Human-readable name for this transport (e.g., "webhook", "log").
    fn channel_name(&self) -> &str;
}

/// How a message actually went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Direct,
    ChannelMention,
    /// Preference `none`: nothing was attempted.
    Skipped,
}

/// Result of routing one message to one holder.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchOutcome {
    pub holder: HolderKey,
    /// Route of the last attempt made.
    pub route: Route,
    pub delivered: bool,
    /// The direct attempt failed and a channel mention was tried instead.
    pub fell_back: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DispatchOutcome {
    /// Whether any send was attempted.
    pub fn attempted(&self) -> bool {
        self.route != Route::Skipped
    }
}
