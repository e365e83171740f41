//! Target reachability probe.
//!
//! A HEAD request against the target URL, falling back to GET when HEAD
//! fails (some origins reject it). Success is any status in [200, 400).
//! Network errors and timeouts are reported as values, never as errors
//! that abort the caller.

use std::time::Duration;

use serde::Serialize;

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Serialize)]
pub struct LivenessReport {
    pub alive: bool,
    pub status: Option<u16>,
    /// Diagnostic for dead targets (HTTP status text or network error).
    pub detail: Option<String>,
}

impl LivenessReport {
    fn alive(status: u16) -> Self {
        Self {
            alive: true,
            status: Some(status),
            detail: None,
        }
    }

    fn dead(status: Option<u16>, detail: String) -> Self {
        Self {
            alive: false,
            status,
            detail: Some(detail),
        }
    }
}

/// Reachability check seam; the check pipeline probes through this.
#[async_trait::async_trait]
pub trait LivenessChecker: Send + Sync {
    async fn check(&self, url: &str) -> LivenessReport;
}

/// Reachability prober with its own (shorter) timeout.
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    client: reqwest::Client,
}

#[async_trait::async_trait]
impl LivenessChecker for LivenessProbe {
    async fn check(&self, url: &str) -> LivenessReport {
        self.probe(url).await
    }
}

impl LivenessProbe {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Probe a URL. HEAD first, GET on HEAD failure.
    pub async fn probe(&self, url: &str) -> LivenessReport {
        match self.client.head(url).send().await {
            Ok(response) if success_status(response.status().as_u16()) => {
                LivenessReport::alive(response.status().as_u16())
            }
            Ok(response) => {
                tracing::debug!(
                    url,
                    status = response.status().as_u16(),
                    "HEAD not conclusive, retrying with GET"
                );
                self.probe_get(url).await
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "HEAD failed, retrying with GET");
                self.probe_get(url).await
            }
        }
    }

    async fn probe_get(&self, url: &str) -> LivenessReport {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if success_status(status) {
                    LivenessReport::alive(status)
                } else {
                    LivenessReport::dead(Some(status), format!("HTTP {status}"))
                }
            }
            Err(e) => LivenessReport::dead(e.status().map(|s| s.as_u16()), e.to_string()),
        }
    }
}

/// Liveness success window: 2xx and 3xx.
fn success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_window_is_200_to_399() {
        assert!(success_status(200));
        assert!(success_status(204));
        assert!(success_status(301));
        assert!(success_status(399));
        assert!(!success_status(400));
        assert!(!success_status(404));
        assert!(!success_status(500));
        assert!(!success_status(199));
    }

    #[tokio::test]
    async fn unreachable_host_reports_dead() {
        let probe = LivenessProbe::new(1).unwrap();
        // Reserved TLD, guaranteed unresolvable.
        let report = probe.probe("http://pagewatch-liveness.invalid/").await;
        assert!(!report.alive);
        assert!(report.detail.is_some());
    }
}
