//! Notification engine for change-detection alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Email, Slack, and generic webhook notifier implementations
//! - Minijinja template rendering for alert messages
//! - Dispatcher with per-channel isolation and a delivery audit trail

pub mod dispatcher;
pub mod email;
pub mod history;
pub mod settings;
pub mod slack;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::{DispatchSummary, Dispatcher};
pub use history::{JsonNotificationHistory, NotificationHistory};
pub use settings::{
    ChannelSettings, EmailChannel, JsonSettingsSource, NotificationSettingsSource, SlackChannel,
    StaticSettingsSource, WebhookChannel,
};
pub use traits::{ChangeAlert, DeliveryRecord, DeliveryStatus, Notifier, NotifyError};
