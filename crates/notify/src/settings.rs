//! Per-owner notification channel settings.
//!
//! Settings decide which channels an alert fans out to and which change
//! categories are muted before the dispatcher ever sees them.

use std::collections::HashMap;

use pagewatch_core::OwnerId;

use crate::traits::NotifyError;

/// Email channel configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmailChannel {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    pub tls: Option<bool>,
    pub from: String,
    pub to: Vec<String>,
}

/// Slack incoming-webhook channel configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SlackChannel {
    pub enabled: bool,
    /// Incoming webhook URL. Supports `${VAR_NAME}` env references.
    pub webhook_url: String,
}

/// Generic HTTP webhook channel configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WebhookChannel {
    pub enabled: bool,
    /// Target URL. Supports `${VAR_NAME}` env references.
    pub url: String,
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    /// Optional minijinja body template; JSON payload when absent.
    pub body_template: Option<String>,
}

/// All channel settings for one owner.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ChannelSettings {
    pub email: Option<EmailChannel>,
    pub slack: Option<SlackChannel>,
    pub webhook: Option<WebhookChannel>,
    /// Suppress alerts for changes classified as minor.
    #[serde(default)]
    pub mute_minor_changes: bool,
    /// Suppress alerts for unreachable-target checks.
    #[serde(default)]
    pub mute_link_broken: bool,
}

impl ChannelSettings {
    /// True when at least one channel is present and enabled.
    pub fn any_enabled(&self) -> bool {
        self.email.as_ref().is_some_and(|c| c.enabled)
            || self.slack.as_ref().is_some_and(|c| c.enabled)
            || self.webhook.as_ref().is_some_and(|c| c.enabled)
    }
}

/// Lookup of channel settings by owner.
#[async_trait::async_trait]
pub trait NotificationSettingsSource: Send + Sync {
    /// Settings for an owner. Owners without stored settings get the
    /// default (all channels off).
    async fn settings_for(&self, owner: OwnerId) -> Result<ChannelSettings, NotifyError>;
}

/// Fixed settings table. Suitable for single-tenant deployments and tests.
#[derive(Debug, Default)]
pub struct StaticSettingsSource {
    entries: HashMap<OwnerId, ChannelSettings>,
}

impl StaticSettingsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, owner: OwnerId, settings: ChannelSettings) -> Self {
        self.entries.insert(owner, settings);
        self
    }
}

#[async_trait::async_trait]
impl NotificationSettingsSource for StaticSettingsSource {
    async fn settings_for(&self, owner: OwnerId) -> Result<ChannelSettings, NotifyError> {
        Ok(self.entries.get(&owner).cloned().unwrap_or_default())
    }
}

/// Channel settings loaded from a JSON file mapping owner id to settings.
/// Read once at startup; owner-facing settings CRUD is an external
/// collaborator.
#[derive(Debug, Default)]
pub struct JsonSettingsSource {
    entries: HashMap<OwnerId, ChannelSettings>,
}

impl JsonSettingsSource {
    pub fn open(path: &std::path::Path) -> Result<Self, NotifyError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no notification settings file, all channels off");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .map_err(|e| NotifyError::Config(format!("read {}: {e}", path.display())))?;
        let entries = serde_json::from_str(&data)
            .map_err(|e| NotifyError::Config(format!("parse {}: {e}", path.display())))?;
        Ok(Self { entries })
    }
}

#[async_trait::async_trait]
impl NotificationSettingsSource for JsonSettingsSource {
    async fn settings_for(&self, owner: OwnerId) -> Result<ChannelSettings, NotifyError> {
        Ok(self.entries.get(&owner).cloned().unwrap_or_default())
    }
}
