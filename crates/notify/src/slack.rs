//! Slack incoming-webhook notifier.
//!
//! Delivers change alerts as `mrkdwn` messages to a Slack incoming
//! webhook URL.

use crate::settings::SlackChannel;
use crate::traits::{ChangeAlert, Notifier, NotifyError};

/// Sends change alerts to a Slack incoming webhook.
#[derive(Debug)]
pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Creates a new `SlackNotifier` from channel settings.
    ///
    /// If `webhook_url` starts with `${`, the value between `${` and `}` is
    /// resolved as an environment variable name. Returns
    /// [`NotifyError::Config`] if the URL is empty or the env var is missing.
    pub fn from_config(channel: &SlackChannel) -> Result<Self, NotifyError> {
        let raw = channel.webhook_url.as_str();
        let resolved_url = if raw.starts_with("${") {
            let var_name = raw
                .strip_prefix("${")
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| {
                    NotifyError::Config(format!("malformed env var reference: {raw}"))
                })?;
            std::env::var(var_name).map_err(|_| {
                NotifyError::Config(format!("environment variable '{var_name}' is not set"))
            })?
        } else {
            raw.to_string()
        };

        if resolved_url.is_empty() {
            return Err(NotifyError::Config(
                "Slack webhook URL must not be empty".to_string(),
            ));
        }

        Ok(Self {
            webhook_url: resolved_url,
            client: reqwest::Client::new(),
        })
    }

    fn format_message(alert: &ChangeAlert) -> String {
        let mut text = format!(
            "*{}*\n{}\n<{}|{}>",
            alert.title, alert.message, alert.target_url, alert.target_label
        );
        if let Some(ref diff_url) = alert.diff_artifact_url {
            text.push_str(&format!("\n<{diff_url}|view diff>"));
        }
        text
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    /// Posts the alert to the incoming webhook.
    ///
    /// Slack responds with a plain `ok` body on success; anything else is
    /// treated as a delivery failure.
    async fn send(&self, alert: &ChangeAlert) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "text": Self::format_message(alert),
        });

        tracing::debug!(channel = "slack", "sending Slack alert");

        let response = self.client.post(&self.webhook_url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let resp_body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Config(format!(
                "Slack webhook returned {status}: {resp_body}"
            )));
        }

        tracing::info!(channel = "slack", "alert delivered");
        Ok(())
    }

    /// Returns `"slack"`.
    fn channel_name(&self) -> &str {
        "slack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::ChangeCategory;

    fn channel(url: &str) -> SlackChannel {
        SlackChannel {
            enabled: true,
            webhook_url: url.to_string(),
        }
    }

    #[test]
    fn env_var_resolution() {
        std::env::set_var("TEST_SLACK_HOOK", "https://hooks.slack.com/services/T/B/X");
        let notifier = SlackNotifier::from_config(&channel("${TEST_SLACK_HOOK}"))
            .expect("should resolve env var");
        assert_eq!(
            notifier.webhook_url,
            "https://hooks.slack.com/services/T/B/X"
        );
        std::env::remove_var("TEST_SLACK_HOOK");
    }

    #[test]
    fn env_var_missing() {
        let result = SlackNotifier::from_config(&channel("${NONEXISTENT_SLACK_VAR_XYZ}"));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("NONEXISTENT_SLACK_VAR_XYZ"));
    }

    #[test]
    fn empty_url_rejected() {
        let result = SlackNotifier::from_config(&channel(""));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("must not be empty"));
    }

    #[test]
    fn literal_url_accepted() {
        let notifier =
            SlackNotifier::from_config(&channel("https://hooks.slack.com/services/T/B/Y"))
                .unwrap();
        assert_eq!(notifier.channel_name(), "slack");
    }

    #[test]
    fn message_includes_diff_link_when_present() {
        let alert = ChangeAlert {
            title: "Change detected".into(),
            message: "whole-page change".into(),
            target_label: "landing".into(),
            target_url: "https://example.com/lp".into(),
            category: ChangeCategory::WholePage,
            diff_artifact_url: Some("https://cdn.example.com/diff.png".into()),
        };
        let text = SlackNotifier::format_message(&alert);
        assert!(text.contains("view diff"));
        assert!(text.contains("https://example.com/lp"));
    }

    #[test]
    fn message_omits_diff_link_when_absent() {
        let alert = ChangeAlert {
            title: "Target unreachable".into(),
            message: "HEAD request failed".into(),
            target_label: "landing".into(),
            target_url: "https://example.com/lp".into(),
            category: ChangeCategory::NoChange,
            diff_artifact_url: None,
        };
        let text = SlackNotifier::format_message(&alert);
        assert!(!text.contains("view diff"));
    }
}
