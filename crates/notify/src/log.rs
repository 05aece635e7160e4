//! Dry-run delivery that only writes to the log.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::traits::{Delivery, NotifyError};

/// Logs every message at `info` and reports success.
#[derive(Debug, Default)]
pub struct LogDelivery {
    sent: AtomicUsize,
}

impl LogDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Delivery for LogDelivery {
    async fn send_direct(&self, external_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(target_user = external_id, text, "[dry-run] direct message");
        Ok(())
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(channel_id, text, "[dry-run] channel message");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_every_send() {
        let d = LogDelivery::new();
        d.send_direct("1", "a").await.unwrap();
        d.send_to_channel("c", "b").await.unwrap();
        assert_eq!(d.sent_count(), 2);
        assert_eq!(d.mention("1"), "<@1>");
    }
}
