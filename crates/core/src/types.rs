//! Domain types shared across the pagewatch crates.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identifiers ───────────────────────────────────────────────

/// Owner (account) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

/// Monitored target identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub Uuid);

/// Schedule (owner + target-group timer) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl TargetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Sentinel id for the per-(owner, day) aggregate quota row.
    pub fn quota_aggregate() -> Self {
        Self(Uuid::nil())
    }
}

impl ScheduleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Targets ───────────────────────────────────────────────────

/// What kind of remote resource a target points at.
///
/// Pages are rendered to a raster and compared region-by-region;
/// creatives are fetched as raw bytes and compared by content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
    Page {
        url: String,
    },
    Creative {
        image_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        click_url: Option<String>,
    },
}

impl TargetKind {
    /// The URL whose liveness is probed before a content check.
    pub fn probe_url(&self) -> &str {
        match self {
            TargetKind::Page { url } => url,
            TargetKind::Creative {
                click_url: Some(url),
                ..
            } => url,
            TargetKind::Creative { image_url, .. } => image_url,
        }
    }

    /// The URL that is captured for content comparison.
    pub fn capture_url(&self) -> &str {
        match self {
            TargetKind::Page { url } => url,
            TargetKind::Creative { image_url, .. } => image_url,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Page { .. } => "page",
            TargetKind::Creative { .. } => "creative",
        }
    }

    /// Comparator family for this kind, recorded on every check.
    pub fn class(&self) -> TargetClass {
        match self {
            TargetKind::Page { .. } => TargetClass::Page,
            TargetKind::Creative { .. } => TargetClass::Creative,
        }
    }
}

/// Page-or-creative discriminant without the URLs, for check records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    Page,
    Creative,
}

/// A monitored landing page or creative. Identity is immutable;
/// display metadata lives outside the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredTarget {
    pub id: TargetId,
    pub owner: OwnerId,
    pub kind: TargetKind,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

// ── Check records ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    ContentChange,
    LinkBroken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Changed,
    Error,
}

/// Classifier output label for a detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    NoChange,
    FirstView,
    Body,
    WholePage,
    Minor,
    Content,
}

impl ChangeCategory {
    pub fn is_change(self) -> bool {
        !matches!(self, ChangeCategory::NoChange)
    }

    pub fn describe(self) -> &'static str {
        match self {
            ChangeCategory::NoChange => "no change",
            ChangeCategory::FirstView => "first-view change",
            ChangeCategory::Body => "body change",
            ChangeCategory::WholePage => "whole-page change",
            ChangeCategory::Minor => "minor change",
            ChangeCategory::Content => "content change",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One observation of a target. Append-only: rotation may null the three
/// artifact references, nothing else is ever mutated.
///
/// For a given target, the record with the greatest `created_at` is the
/// latest; only its `current_artifact` is the baseline for the next check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: Uuid,
    pub target_id: TargetId,
    pub target_kind: TargetClass,
    pub check_kind: CheckKind,
    pub status: CheckStatus,
    pub message: String,
    /// Artifact key of the capture taken by this check.
    pub current_artifact: Option<String>,
    /// Artifact key of the superseded baseline (changed checks only).
    pub previous_artifact: Option<String>,
    /// Artifact key of the diff visualization (pixel comparator only).
    pub diff_artifact: Option<String>,
    pub overall_pct: Option<f64>,
    pub first_view_pct: Option<f64>,
    pub body_pct: Option<f64>,
    /// Free-text diagnostic (capture errors, liveness detail, ...).
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CheckRecord {
    /// Whether this record captured a "changed" transition. Such records
    /// keep their artifacts permanently for audit and are never rotated.
    pub fn is_changed_transition(&self) -> bool {
        self.previous_artifact.is_some() || self.diff_artifact.is_some()
    }
}

// ── Schedule state ────────────────────────────────────────────

/// Per-(owner, target-group) timer state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleState {
    pub id: ScheduleId,
    pub owner: OwnerId,
    pub enabled: bool,
    /// Days between monitoring cycles (>= 1).
    pub interval_days: u32,
    /// Local wall-clock hour (0-23) the cycle should fire at.
    pub execute_hour: u32,
    #[serde(default)]
    pub excluded_targets: HashSet<TargetId>,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Invariant: whenever written non-null, strictly in the future
    /// relative to the clock that wrote it.
    pub next_run_at: Option<DateTime<Utc>>,
}

// ── Quota records ─────────────────────────────────────────────

/// Per-(owner, target, day) manual-check bookkeeping. The aggregate
/// daily counter lives in the row keyed by [`TargetId::quota_aggregate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub owner: OwnerId,
    pub target: TargetId,
    pub day: NaiveDate,
    pub last_monitored_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub count: u32,
}

// ── Plan limits ───────────────────────────────────────────────

/// Read-only plan limits supplied by the external plan/billing system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlanLimits {
    pub min_interval_days: u32,
    pub max_targets: usize,
    /// `None` means the plan imposes no daily manual-check cap.
    pub max_daily_manual_checks: Option<u32>,
    /// Unlimited-tier owners skip the per-target cooldown.
    pub unlimited_manual: bool,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            min_interval_days: 1,
            max_targets: 50,
            max_daily_manual_checks: None,
            unlimited_manual: false,
        }
    }
}
