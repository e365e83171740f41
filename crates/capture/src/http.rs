//! HTTP capture provider with bounded linear-backoff retries.
//!
//! Pages are rendered by POSTing `{ "url": ... }` to an external render
//! service that answers with PNG bytes; creatives are fetched directly.
//! Capture is the dominant blocking operation of a check, so every
//! attempt carries an explicit timeout and the retry count is small.

use std::time::Duration;

use bytes::Bytes;
use pagewatch_core::config::CaptureConfig;
use pagewatch_core::TargetKind;

use crate::provider::{CaptureError, CaptureProvider};

/// Base delay between retry attempts; attempt `n` waits `n * BACKOFF_STEP`.
const BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Reqwest-backed capture provider.
#[derive(Debug, Clone)]
pub struct HttpCaptureProvider {
    client: reqwest::Client,
    renderer_url: Option<String>,
    attempts: u32,
}

impl HttpCaptureProvider {
    /// Build a provider from capture configuration.
    ///
    /// The per-attempt timeout is applied at the client level so both
    /// render calls and direct fetches share it.
    pub fn from_config(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            renderer_url: config.renderer_url.clone(),
            attempts: config.attempts.max(1),
        })
    }

    async fn capture_once(&self, kind: &TargetKind) -> Result<Bytes, CaptureError> {
        let response = match kind {
            TargetKind::Page { url } => {
                let renderer = self
                    .renderer_url
                    .as_deref()
                    .ok_or(CaptureError::NotConfigured)?;
                self.client
                    .post(renderer)
                    .json(&serde_json::json!({ "url": url }))
                    .send()
                    .await?
            }
            TargetKind::Creative { image_url, .. } => self.client.get(image_url).send().await?,
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CaptureError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait::async_trait]
impl CaptureProvider for HttpCaptureProvider {
    async fn capture(&self, kind: &TargetKind) -> Result<Bytes, CaptureError> {
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            match self.capture_once(kind).await {
                Ok(bytes) => {
                    tracing::debug!(
                        url = kind.capture_url(),
                        attempt,
                        size = bytes.len(),
                        "capture succeeded"
                    );
                    return Ok(bytes);
                }
                // Misconfiguration will not heal with retries.
                Err(CaptureError::NotConfigured) => return Err(CaptureError::NotConfigured),
                Err(e) => {
                    tracing::warn!(
                        url = kind.capture_url(),
                        attempt,
                        error = %e,
                        "capture attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.attempts {
                        tokio::time::sleep(BACKOFF_STEP * attempt).await;
                    }
                }
            }
        }

        Err(CaptureError::Exhausted {
            attempts: self.attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::config::CaptureConfig;

    fn config(renderer: Option<&str>) -> CaptureConfig {
        CaptureConfig {
            renderer_url: renderer.map(String::from),
            timeout_secs: 5,
            attempts: 2,
            liveness_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn page_capture_without_renderer_is_not_configured() {
        let provider = HttpCaptureProvider::from_config(&config(None)).unwrap();
        let kind = TargetKind::Page {
            url: "https://example.com".into(),
        };
        let err = provider.capture(&kind).await.unwrap_err();
        assert!(matches!(err, CaptureError::NotConfigured));
    }

    #[test]
    fn attempts_are_clamped_to_at_least_one() {
        let mut cfg = config(None);
        cfg.attempts = 0;
        let provider = HttpCaptureProvider::from_config(&cfg).unwrap();
        assert_eq!(provider.attempts, 1);
    }
}
