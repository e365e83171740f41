//! The Check operation: one observation of one target.
//!
//! Pipeline: liveness probe → capture → diff against the baseline →
//! classify → persist record and artifacts → rotate the superseded
//! baseline → conditionally notify. Pages and creatives share this
//! pipeline; only the comparator differs.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use pagewatch_capture::{CaptureProvider, LivenessChecker};
use pagewatch_core::{
    ChangeCategory, CheckKind, CheckRecord, CheckStatus, MonitoredTarget, TargetId, TargetKind,
};
use pagewatch_diff::{classify, comparator_for, DiffOutcome};
use pagewatch_notify::{ChangeAlert, Dispatcher, NotificationSettingsSource};
use pagewatch_store::{ArtifactStore, CheckLedger, StoreError};

use crate::error::EngineError;
use crate::inflight::InflightRegistry;
use crate::rotation::rotate_superseded;

/// Diagnostic recorded on a target's very first check.
const BASELINE_ESTABLISHED: &str = "initial capture - baseline established";

/// Runs checks against monitored targets.
pub struct CheckRunner {
    capture: Arc<dyn CaptureProvider>,
    liveness: Arc<dyn LivenessChecker>,
    artifacts: Arc<dyn ArtifactStore>,
    ledger: Arc<dyn CheckLedger>,
    dispatcher: Arc<Dispatcher>,
    settings: Arc<dyn NotificationSettingsSource>,
    /// Targets currently mid-check; shared with every trigger path so a
    /// manual check and a scheduled check never overlap on one target.
    inflight: InflightRegistry<TargetId>,
}

impl CheckRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capture: Arc<dyn CaptureProvider>,
        liveness: Arc<dyn LivenessChecker>,
        artifacts: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn CheckLedger>,
        dispatcher: Arc<Dispatcher>,
        settings: Arc<dyn NotificationSettingsSource>,
        inflight: InflightRegistry<TargetId>,
    ) -> Self {
        Self {
            capture,
            liveness,
            artifacts,
            ledger,
            dispatcher,
            settings,
            inflight,
        }
    }

    /// Run one check against a target.
    ///
    /// Capture and liveness failures are recorded as error checks, not
    /// surfaced as `Err`: the returned record carries the diagnostic.
    /// Only storage-put and ledger failures propagate.
    ///
    /// # Errors
    ///
    /// [`EngineError::TargetBusy`] when the target is already mid-check.
    pub async fn run_check(&self, target: &MonitoredTarget) -> Result<CheckRecord, EngineError> {
        let Some(_guard) = self.inflight.try_claim(target.id) else {
            tracing::debug!(target = %target.id, "target already in flight, skipping");
            return Err(EngineError::TargetBusy);
        };

        let report = self.liveness.check(target.kind.probe_url()).await;
        if !report.alive {
            let mut record = new_record(
                target,
                CheckKind::LinkBroken,
                CheckStatus::Error,
                "target unreachable".into(),
            );
            record.detail = report.detail.clone();
            self.ledger.append(record.clone()).await?;
            tracing::info!(target = %target.id, detail = ?report.detail, "target unreachable");
            self.notify_link_broken(target, &record).await;
            return Ok(record);
        }

        let current = match self.capture.capture(&target.kind).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let mut record = new_record(
                    target,
                    CheckKind::ContentChange,
                    CheckStatus::Error,
                    "capture failed".into(),
                );
                record.detail = Some(e.to_string());
                self.ledger.append(record.clone()).await?;
                tracing::warn!(target = %target.id, error = %e, "capture failed");
                return Ok(record);
            }
        };

        let previous = self.ledger.latest(target.id).await?;
        let baseline = match previous {
            Some(ref prev) => self.fetch_baseline(prev).await?,
            None => None,
        };

        let mut record = new_record(
            target,
            CheckKind::ContentChange,
            CheckStatus::Ok,
            "no change".into(),
        );
        let (capture_key, content_type) = capture_key(target, record.id);

        let Some(baseline) = baseline else {
            // First observation (or the prior baseline is gone): seed the
            // next comparison without signaling a change.
            record.message = "baseline established".into();
            record.detail = Some(BASELINE_ESTABLISHED.into());
            self.artifacts.put(&capture_key, current, content_type).await?;
            record.current_artifact = Some(capture_key);
            self.ledger.append(record.clone()).await?;
            tracing::info!(target = %target.id, "baseline established");
            return Ok(record);
        };

        let outcome = match comparator_for(&target.kind).compare(&baseline, &current) {
            Ok(outcome) => outcome,
            Err(e) => {
                record.status = CheckStatus::Error;
                record.message = "comparison failed".into();
                record.detail = Some(e.to_string());
                self.ledger.append(record.clone()).await?;
                tracing::warn!(target = %target.id, error = %e, "comparison failed");
                return Ok(record);
            }
        };

        let classification = classify(&outcome);
        if let DiffOutcome::Pixel { metrics, .. } = &outcome {
            record.overall_pct = Some(metrics.overall);
            record.first_view_pct = Some(metrics.first_view);
            record.body_pct = Some(metrics.body);
        }

        self.artifacts.put(&capture_key, current, content_type).await?;
        record.current_artifact = Some(capture_key);

        if classification.changed {
            record.status = CheckStatus::Changed;
            record.message = classification.category.describe().into();
            // Reference the superseded baseline; the blob itself stays put.
            record.previous_artifact = previous
                .as_ref()
                .and_then(|p| p.current_artifact.clone());
            if let DiffOutcome::Pixel {
                diff_image: Some(mask),
                ..
            } = outcome
            {
                let diff_key = diff_key(target.id, record.id);
                self.artifacts
                    .put(&diff_key, Bytes::from(mask), "image/png")
                    .await?;
                record.diff_artifact = Some(diff_key);
            }
        }

        self.ledger.append(record.clone()).await?;
        tracing::info!(
            target = %target.id,
            changed = classification.changed,
            category = %classification.category,
            "check recorded"
        );

        if classification.changed {
            self.notify_change(target, &record, classification.category)
                .await;
        } else if let Some(prev) = previous {
            rotate_superseded(self.ledger.as_ref(), self.artifacts.as_ref(), &prev).await;
        }

        Ok(record)
    }

    /// Run a manual check under an operation-level timeout.
    ///
    /// On timeout the underlying check keeps running in the background so
    /// the ledger write always completes; the caller just stops waiting.
    pub async fn run_manual(
        self: &Arc<Self>,
        target: MonitoredTarget,
        timeout: Duration,
    ) -> Result<CheckRecord, EngineError> {
        let runner = Arc::clone(self);
        let handle = tokio::spawn(async move { runner.run_check(&target).await });

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EngineError::Internal(join_err.to_string())),
            Err(_) => Err(EngineError::Timeout {
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn fetch_baseline(&self, prev: &CheckRecord) -> Result<Option<Bytes>, EngineError> {
        let Some(ref key) = prev.current_artifact else {
            return Ok(None);
        };
        match self.artifacts.get(key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(key, "baseline blob missing, re-establishing");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn notify_change(
        &self,
        target: &MonitoredTarget,
        record: &CheckRecord,
        category: ChangeCategory,
    ) {
        let settings = match self.settings.settings_for(target.owner).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(owner = %target.owner, error = %e, "settings lookup failed");
                return;
            }
        };
        if category == ChangeCategory::Minor && settings.mute_minor_changes {
            tracing::debug!(target = %target.id, "minor change muted");
            return;
        }

        let mut message = format!("{} detected", category.describe());
        if let Some(pct) = record.overall_pct {
            message.push_str(&format!(" ({pct:.1}% of pixels differ)"));
        }

        let alert = ChangeAlert {
            title: format!("Change detected: {}", target.label),
            message,
            target_label: target.label.clone(),
            target_url: target.kind.capture_url().to_string(),
            category,
            diff_artifact_url: record
                .diff_artifact
                .as_deref()
                .map(|k| self.artifacts.url_for(k)),
        };

        match self.dispatcher.dispatch(target.owner, &settings, &alert).await {
            Ok(summary) => {
                tracing::info!(
                    target = %target.id,
                    delivered = summary.delivered,
                    attempts = summary.attempts.len(),
                    "change alert dispatched"
                );
            }
            Err(e) => {
                tracing::warn!(target = %target.id, error = %e, "alert dispatch failed");
            }
        }
    }

    async fn notify_link_broken(&self, target: &MonitoredTarget, record: &CheckRecord) {
        let settings = match self.settings.settings_for(target.owner).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(owner = %target.owner, error = %e, "settings lookup failed");
                return;
            }
        };
        if settings.mute_link_broken {
            tracing::debug!(target = %target.id, "link-broken alert muted");
            return;
        }

        let alert = ChangeAlert {
            title: format!("Target unreachable: {}", target.label),
            message: record
                .detail
                .clone()
                .unwrap_or_else(|| "target unreachable".into()),
            target_label: target.label.clone(),
            target_url: target.kind.probe_url().to_string(),
            category: ChangeCategory::NoChange,
            diff_artifact_url: None,
        };

        if let Err(e) = self.dispatcher.dispatch(target.owner, &settings, &alert).await {
            tracing::warn!(target = %target.id, error = %e, "alert dispatch failed");
        }
    }
}

fn new_record(
    target: &MonitoredTarget,
    check_kind: CheckKind,
    status: CheckStatus,
    message: String,
) -> CheckRecord {
    CheckRecord {
        id: Uuid::new_v4(),
        target_id: target.id,
        target_kind: target.kind.class(),
        check_kind,
        status,
        message,
        current_artifact: None,
        previous_artifact: None,
        diff_artifact: None,
        overall_pct: None,
        first_view_pct: None,
        body_pct: None,
        detail: None,
        created_at: Utc::now(),
    }
}

fn capture_key(target: &MonitoredTarget, check_id: Uuid) -> (String, &'static str) {
    match target.kind {
        TargetKind::Page { .. } => (
            format!("captures/{}/{}.png", target.id, check_id),
            "image/png",
        ),
        TargetKind::Creative { .. } => (
            format!("captures/{}/{}.bin", target.id, check_id),
            "application/octet-stream",
        ),
    }
}

fn diff_key(target: TargetId, check_id: Uuid) -> String {
    format!("diffs/{target}/{check_id}.png")
}
