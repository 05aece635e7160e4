//! Outbound notifications for on-call holders.
//!
//! This crate provides:
//! - `Delivery` trait for pluggable transports
//! - Webhook and log-only delivery implementations
//! - Minijinja templates for shift-start, reminder and heads-up messages
//! - Dispatcher that applies notify preferences and channel fallback

pub mod dispatcher;
pub mod log;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::{DeliveryRequest, Dispatcher};
pub use log::LogDelivery;
pub use templating::{MessageTemplates, TemplateRenderer};
pub use traits::{Delivery, DispatchOutcome, NotifyError, Route};
pub use webhook::WebhookDelivery;
