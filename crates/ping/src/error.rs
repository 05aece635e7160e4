use oncall_notify::NotifyError;
use oncall_store::StoreError;

/// A tick that could not complete. Caught by the scheduler loop, logged,
/// and retried only on the next regular interval.
#[derive(Debug, thiserror::Error)]
pub enum PingError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("message rendering failed: {0}")]
    Template(#[from] NotifyError),
}
