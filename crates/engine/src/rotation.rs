//! Baseline rotation.
//!
//! Unchanged observations would grow artifact storage without bound, so
//! when an unchanged check supersedes a previous unchanged record, that
//! record's blob is deleted and its references nulled. Changed-transition
//! records (those carrying a previous or diff reference) are never
//! rotated: their pair of blobs plus the diff mask are the audit trail.
//!
//! Rotation never fails a check. Delete errors leave an orphan blob and
//! skip the reference nulling, so the ledger never points at a blob that
//! was successfully deleted.

use pagewatch_core::CheckRecord;
use pagewatch_store::{ArtifactStore, CheckLedger};

/// Rotate the record superseded by an unchanged check.
///
/// Returns whether the record was actually rotated.
pub async fn rotate_superseded(
    ledger: &dyn CheckLedger,
    artifacts: &dyn ArtifactStore,
    superseded: &CheckRecord,
) -> bool {
    if superseded.is_changed_transition() {
        tracing::debug!(
            target = %superseded.target_id,
            record = %superseded.id,
            "superseded record is a changed transition, keeping artifacts"
        );
        return false;
    }

    let Some(ref key) = superseded.current_artifact else {
        // Already rotated, or an error record without a capture.
        return false;
    };

    // Best-effort delete. The store treats "already gone" as success, so
    // only a real backend failure lands here.
    if let Err(e) = artifacts.delete(key).await {
        tracing::warn!(
            target = %superseded.target_id,
            record = %superseded.id,
            key,
            error = %e,
            "rotation delete failed, leaving orphan blob"
        );
        return false;
    }

    if let Err(e) = ledger
        .clear_artifacts(superseded.target_id, superseded.id)
        .await
    {
        tracing::warn!(
            target = %superseded.target_id,
            record = %superseded.id,
            error = %e,
            "rotation reference clear failed"
        );
        return false;
    }

    tracing::debug!(
        target = %superseded.target_id,
        record = %superseded.id,
        key,
        "baseline rotated"
    );
    true
}
