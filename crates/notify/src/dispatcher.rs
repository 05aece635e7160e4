//! Routes a message to one holder according to their notify preference.
//!
//! Direct delivery and the channel-mention fallback are two explicit steps.
//! Whether the second step may run is decided by the caller per message, so
//! shift-start notices can fall back while periodic reminders cannot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use oncall_core::{HolderKey, NotifyPreference};

use crate::traits::{Delivery, DispatchOutcome, NotifyError, Route};

/// One message addressed to one roster entry.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub holder: HolderKey,
    pub external_id: String,
    pub preference: NotifyPreference,
    pub text: String,
}

/// Applies routing policy on top of a [`Delivery`] transport.
pub struct Dispatcher {
    delivery: Arc<dyn Delivery>,
    channel_id: String,
    /// Upper bound for each individual send.
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        delivery: Arc<dyn Delivery>,
        channel_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            delivery,
            channel_id: channel_id.into(),
            timeout,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Transport-specific mention for `external_id`.
    pub fn mention(&self, external_id: &str) -> String {
        self.delivery.mention(external_id)
    }

    /// Direct message to `external_id`, bounded by the send timeout.
    pub async fn attempt_direct(&self, external_id: &str, text: &str) -> Result<(), NotifyError> {
        self.bounded(self.delivery.send_direct(external_id, text)).await
    }

    /// Mention `external_id` in the configured channel.
    pub async fn attempt_fallback(&self, external_id: &str, text: &str) -> Result<(), NotifyError> {
        let body = format!("{} {}", self.mention(external_id), text);
        self.bounded(self.delivery.send_to_channel(&self.channel_id, &body))
            .await
    }

    /// Post `text` to the configured channel as-is.
    pub async fn announce(&self, text: &str) -> Result<(), NotifyError> {
        let start = Instant::now();
        let result = self
            .bounded(self.delivery.send_to_channel(&self.channel_id, text))
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => tracing::info!(
                channel = self.delivery.channel_name(),
                duration_ms,
                "announcement posted"
            ),
            Err(e) => tracing::warn!(
                channel = self.delivery.channel_name(),
                error = %e,
                duration_ms,
                "announcement failed"
            ),
        }
        result
    }

    /// Route `request` by preference.
    ///
    /// `dm` tries a direct message first and, only when
    /// `allow_channel_fallback` is set, a channel mention after a failure.
    /// `channel` always mentions in the channel. `none` sends nothing.
    /// Failures are reported in the outcome, never returned.
    pub async fn deliver(
        &self,
        request: &DeliveryRequest,
        allow_channel_fallback: bool,
    ) -> DispatchOutcome {
        let start = Instant::now();
        let holder = &request.holder;

        let (route, result, fell_back) = match request.preference {
            NotifyPreference::None => {
                tracing::debug!(holder = %holder, "notifications off, skipping");
                (Route::Skipped, Ok(()), false)
            }
            NotifyPreference::Channel => {
                let result = self.attempt_fallback(&request.external_id, &request.text).await;
                (Route::ChannelMention, result, false)
            }
            NotifyPreference::Dm => match self
                .attempt_direct(&request.external_id, &request.text)
                .await
            {
                Ok(()) => (Route::Direct, Ok(()), false),
                Err(e) if allow_channel_fallback => {
                    tracing::warn!(
                        holder = %holder,
                        error = %e,
                        "direct message failed, falling back to channel mention"
                    );
                    let result = self.attempt_fallback(&request.external_id, &request.text).await;
                    (Route::ChannelMention, result, true)
                }
                Err(e) => (Route::Direct, Err(e), false),
            },
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let error = match result {
            Ok(()) => {
                if route != Route::Skipped {
                    tracing::info!(
                        holder = %holder,
                        route = ?route,
                        channel = self.delivery.channel_name(),
                        duration_ms,
                        "notification delivered"
                    );
                }
                None
            }
            Err(e) => {
                tracing::warn!(
                    holder = %holder,
                    route = ?route,
                    channel = self.delivery.channel_name(),
                    error = %e,
                    duration_ms,
                    "notification delivery failed"
                );
                Some(e.to_string())
            }
        };

        DispatchOutcome {
            holder: holder.clone(),
            route,
            delivered: route != Route::Skipped && error.is_none(),
            fell_back,
            error,
            duration_ms,
        }
    }

    async fn bounded<F>(&self, send: F) -> Result<(), NotifyError>
    where
        F: std::future::Future<Output = Result<(), NotifyError>>,
    {
        match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }
}
