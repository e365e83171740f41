//! Fans alerts out to an owner's configured channels.
//!
//! Channels are built from [`ChannelSettings`] at dispatch time so that
//! settings changes take effect immediately. Individual channel failures
//! never block the other channels, and every attempt is written to the
//! delivery audit trail.

use std::sync::Arc;

use chrono::Utc;

use pagewatch_core::OwnerId;

use crate::email::EmailNotifier;
use crate::history::NotificationHistory;
use crate::settings::ChannelSettings;
use crate::slack::SlackNotifier;
use crate::templating::TemplateRenderer;
use crate::traits::{ChangeAlert, DeliveryRecord, DeliveryStatus, Notifier, NotifyError};
use crate::webhook::WebhookNotifier;

/// Outcome of one fan-out.
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    /// True when at least one channel accepted the alert.
    pub delivered: bool,
    /// One record per attempted channel, in configuration order.
    pub attempts: Vec<DeliveryRecord>,
}

/// Dispatches change alerts to all enabled channels of an owner.
pub struct Dispatcher {
    renderer: Arc<TemplateRenderer>,
    history: Arc<dyn NotificationHistory>,
}

impl Dispatcher {
    pub fn new(history: Arc<dyn NotificationHistory>) -> Self {
        Self {
            renderer: Arc::new(TemplateRenderer::new()),
            history,
        }
    }

    /// Build notifiers for every enabled channel in `settings`.
    ///
    /// A channel whose construction fails is returned as an error entry
    /// so it still shows up in the audit trail.
    fn build_channels(
        &self,
        settings: &ChannelSettings,
    ) -> Vec<Result<Box<dyn Notifier>, (String, NotifyError)>> {
        let mut channels: Vec<Result<Box<dyn Notifier>, (String, NotifyError)>> = Vec::new();

        if let Some(email) = settings.email.as_ref().filter(|c| c.enabled) {
            channels.push(
                EmailNotifier::from_config(email, self.renderer.clone())
                    .map(|n| Box::new(n) as Box<dyn Notifier>)
                    .map_err(|e| ("email".to_string(), e)),
            );
        }
        if let Some(slack) = settings.slack.as_ref().filter(|c| c.enabled) {
            channels.push(
                SlackNotifier::from_config(slack)
                    .map(|n| Box::new(n) as Box<dyn Notifier>)
                    .map_err(|e| ("slack".to_string(), e)),
            );
        }
        if let Some(webhook) = settings.webhook.as_ref().filter(|c| c.enabled) {
            channels.push(
                WebhookNotifier::from_config(webhook, self.renderer.clone())
                    .map(|n| Box::new(n) as Box<dyn Notifier>)
                    .map_err(|e| ("webhook".to_string(), e)),
            );
        }

        channels
    }

    /// Fan an alert out to all of an owner's enabled channels.
    ///
    /// Never returns a delivery error: per-channel outcomes land in the
    /// summary and the audit trail. Only audit-trail write failures
    /// propagate.
    pub async fn dispatch(
        &self,
        owner: OwnerId,
        settings: &ChannelSettings,
        alert: &ChangeAlert,
    ) -> Result<DispatchSummary, NotifyError> {
        let channels = self.build_channels(settings);

        if channels.is_empty() {
            tracing::debug!(%owner, "no notification channels configured");
            return Ok(DispatchSummary {
                delivered: false,
                attempts: Vec::new(),
            });
        }

        let mut attempts = Vec::with_capacity(channels.len());

        for channel in channels {
            let record = match channel {
                Ok(notifier) => self.attempt(owner, notifier.as_ref(), alert).await,
                Err((name, err)) => {
                    tracing::warn!(%owner, channel = %name, error = %err, "channel misconfigured");
                    DeliveryRecord {
                        owner,
                        channel: name,
                        status: DeliveryStatus::Failed,
                        error: Some(err.to_string()),
                        sent_at: Some(Utc::now()),
                    }
                }
            };
            self.history.append(record.clone()).await?;
            attempts.push(record);
        }

        let delivered = attempts
            .iter()
            .any(|r| r.status == DeliveryStatus::Success);

        Ok(DispatchSummary {
            delivered,
            attempts,
        })
    }

    async fn attempt(
        &self,
        owner: OwnerId,
        notifier: &dyn Notifier,
        alert: &ChangeAlert,
    ) -> DeliveryRecord {
        let start = std::time::Instant::now();
        let result = notifier.send(alert).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, error) = match result {
            Ok(()) => {
                tracing::info!(
                    %owner,
                    channel = notifier.channel_name(),
                    duration_ms,
                    "alert delivered"
                );
                (DeliveryStatus::Success, None)
            }
            Err(e) => {
                tracing::warn!(
                    %owner,
                    channel = notifier.channel_name(),
                    error = %e,
                    duration_ms,
                    "alert delivery failed"
                );
                (DeliveryStatus::Failed, Some(e.to_string()))
            }
        };

        DeliveryRecord {
            owner,
            channel: notifier.channel_name().to_string(),
            status,
            error,
            sent_at: Some(Utc::now()),
        }
    }

    /// Deliver to pre-built channels. Used by tests and channel smoke tests.
    #[cfg(test)]
    async fn dispatch_channels(
        &self,
        owner: OwnerId,
        channels: Vec<Box<dyn Notifier>>,
        alert: &ChangeAlert,
    ) -> Result<DispatchSummary, NotifyError> {
        let mut attempts = Vec::with_capacity(channels.len());
        for notifier in channels {
            let record = self.attempt(owner, notifier.as_ref(), alert).await;
            self.history.append(record.clone()).await?;
            attempts.push(record);
        }
        let delivered = attempts
            .iter()
            .any(|r| r.status == DeliveryStatus::Success);
        Ok(DispatchSummary {
            delivered,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::JsonNotificationHistory;
    use pagewatch_core::ChangeCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _alert: &ChangeAlert) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Config("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn alert() -> ChangeAlert {
        ChangeAlert {
            title: "Change detected".into(),
            message: "body change on landing".into(),
            target_label: "landing".into(),
            target_url: "https://example.com/lp".into(),
            category: ChangeCategory::Body,
            diff_artifact_url: None,
        }
    }

    fn mock(name: &str, count: &Arc<AtomicUsize>, should_fail: bool) -> Box<dyn Notifier> {
        Box::new(MockNotifier {
            name: name.to_string(),
            send_count: count.clone(),
            should_fail,
        })
    }

    #[tokio::test]
    async fn dispatch_to_all_channels() {
        let history = Arc::new(JsonNotificationHistory::in_memory());
        let dispatcher = Dispatcher::new(history.clone());
        let owner = OwnerId::new();

        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        let channels = vec![mock("a", &count_a, false), mock("b", &count_b, false)];

        let summary = dispatcher
            .dispatch_channels(owner, channels, &alert())
            .await
            .unwrap();
        assert!(summary.delivered);
        assert_eq!(summary.attempts.len(), 2);
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);

        let records = history.for_owner(owner, 10).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let history = Arc::new(JsonNotificationHistory::in_memory());
        let dispatcher = Dispatcher::new(history.clone());
        let owner = OwnerId::new();

        let slack_count = Arc::new(AtomicUsize::new(0));
        let channels = vec![
            mock("email", &Arc::new(AtomicUsize::new(0)), true),
            mock("slack", &slack_count, false),
        ];

        let summary = dispatcher
            .dispatch_channels(owner, channels, &alert())
            .await
            .unwrap();

        // Overall dispatch counts as successful; both outcomes are audited.
        assert!(summary.delivered);
        assert_eq!(summary.attempts.len(), 2);
        assert_eq!(summary.attempts[0].status, DeliveryStatus::Failed);
        assert!(summary.attempts[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("mock failure")));
        assert_eq!(summary.attempts[1].status, DeliveryStatus::Success);
        assert_eq!(slack_count.load(Ordering::SeqCst), 1);

        let records = history.for_owner(owner, 10).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn all_channels_failing_is_not_delivered() {
        let history = Arc::new(JsonNotificationHistory::in_memory());
        let dispatcher = Dispatcher::new(history.clone());
        let owner = OwnerId::new();

        let channels = vec![
            mock("email", &Arc::new(AtomicUsize::new(0)), true),
            mock("slack", &Arc::new(AtomicUsize::new(0)), true),
        ];

        let summary = dispatcher
            .dispatch_channels(owner, channels, &alert())
            .await
            .unwrap();
        assert!(!summary.delivered);
        assert!(summary
            .attempts
            .iter()
            .all(|r| r.status == DeliveryStatus::Failed));
    }

    #[tokio::test]
    async fn no_channels_configured_returns_empty_summary() {
        let history = Arc::new(JsonNotificationHistory::in_memory());
        let dispatcher = Dispatcher::new(history.clone());
        let owner = OwnerId::new();

        let summary = dispatcher
            .dispatch(owner, &ChannelSettings::default(), &alert())
            .await
            .unwrap();
        assert!(!summary.delivered);
        assert!(summary.attempts.is_empty());
        assert!(history.for_owner(owner, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn misconfigured_channel_is_audited_as_failure() {
        let history = Arc::new(JsonNotificationHistory::in_memory());
        let dispatcher = Dispatcher::new(history.clone());
        let owner = OwnerId::new();

        let settings = ChannelSettings {
            email: Some(crate::settings::EmailChannel {
                enabled: true,
                smtp_host: "smtp.example.com".into(),
                smtp_port: None,
                tls: None,
                from: "not-an-address".into(),
                to: vec!["admin@example.com".into()],
            }),
            ..Default::default()
        };

        let summary = dispatcher.dispatch(owner, &settings, &alert()).await.unwrap();
        assert!(!summary.delivered);
        assert_eq!(summary.attempts.len(), 1);
        assert_eq!(summary.attempts[0].channel, "email");
        assert_eq!(summary.attempts[0].status, DeliveryStatus::Failed);

        let records = history.for_owner(owner, 10).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
