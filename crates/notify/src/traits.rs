//! Notifier trait definition and shared types.

use chrono::{DateTime, Utc};
use pagewatch_core::{ChangeCategory, OwnerId};

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// A rendered change alert ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangeAlert {
    /// Alert title (email subject / message headline).
    pub title: String,
    /// Rendered body text.
    pub message: String,
    /// Display label of the target that changed.
    pub target_label: String,
    /// URL of the monitored target.
    pub target_url: String,
    /// Classifier category for the observed change.
    pub category: ChangeCategory,
    /// URL of the diff visualization, when one exists.
    pub diff_artifact_url: Option<String>,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an alert through this channel.
    async fn send(&self, alert: &ChangeAlert) -> Result<(), NotifyError>;

    /// Test connectivity with a sample alert.
    async fn test(&self) -> Result<(), NotifyError> {
        let alert = ChangeAlert {
            title: "[TEST] pagewatch delivery test".to_string(),
            message: "This is a test notification from pagewatch.".to_string(),
            target_label: "test target".to_string(),
            target_url: "https://example.com".to_string(),
            category: ChangeCategory::NoChange,
            diff_artifact_url: None,
        };
        self.send(&alert).await
    }

    /// Human-readable name for this channel (e.g., "email", "slack").
    fn channel_name(&self) -> &str;
}

/// Delivery outcome of one channel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

/// One audited delivery attempt.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeliveryRecord {
    pub owner: OwnerId,
    pub channel: String,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}
