use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use pagewatch_core::{
    CheckRecord, MonitoredTarget, OwnerId, ScheduleId, ScheduleState, TargetId, TargetKind,
};
use pagewatch_engine::{corrected_schedule, EngineError};
use pagewatch_notify::DeliveryRecord;

use crate::state::AppState;

// ── Error mapping ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API-facing error: an engine error plus the status it maps to.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::TargetNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::TargetBusy => StatusCode::CONFLICT,
            EngineError::CooldownActive { .. } | EngineError::DailyCapReached { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<pagewatch_store::StoreError> for ApiError {
    fn from(err: pagewatch_store::StoreError) -> Self {
        EngineError::from(err).into()
    }
}

impl From<pagewatch_notify::NotifyError> for ApiError {
    fn from(err: pagewatch_notify::NotifyError) -> Self {
        EngineError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Targets ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterTargetRequest {
    pub owner: OwnerId,
    #[serde(flatten)]
    pub kind: TargetKind,
    pub label: String,
}

#[derive(Serialize)]
pub struct RegisterTargetResponse {
    pub target: MonitoredTarget,
    /// The baseline-establishing check run at registration.
    pub initial_check: CheckRecord,
}

/// Register a target and immediately run its first check so the next
/// scheduled cycle has a baseline to compare against.
pub async fn register_target(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterTargetRequest>,
) -> Result<Json<RegisterTargetResponse>, ApiError> {
    if req.label.trim().is_empty() {
        return Err(ApiError::bad_request("label must not be empty"));
    }
    if req.kind.capture_url().trim().is_empty() {
        return Err(ApiError::bad_request("target URL must not be empty"));
    }

    let target = MonitoredTarget {
        id: TargetId::new(),
        owner: req.owner,
        kind: req.kind,
        label: req.label,
        created_at: Utc::now(),
    };
    state.targets.insert(target.clone()).await?;
    tracing::info!(target = %target.id, kind = target.kind.label(), "target registered");

    let initial_check = state.runner.run_check(&target).await?;
    Ok(Json(RegisterTargetResponse {
        target,
        initial_check,
    }))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// Check history for a target, newest first.
pub async fn target_checks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TargetId>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<CheckRecord>>, ApiError> {
    if state.targets.get(id).await?.is_none() {
        return Err(EngineError::TargetNotFound(id).into());
    }
    let limit = params.limit.unwrap_or(50).min(500);
    let records = state.ledger.history(id, limit).await?;
    Ok(Json(records))
}

/// Manually trigger one check, subject to the cooldown and daily cap.
pub async fn manual_check(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TargetId>,
) -> Result<Json<CheckRecord>, ApiError> {
    let target = state
        .targets
        .get(id)
        .await?
        .ok_or_else(|| ApiError::from(EngineError::TargetNotFound(id)))?;

    // Quota is consumed here, before the check runs: a failed check
    // still counts against the cap.
    state.quota.authorize(target.owner, id, Utc::now()).await?;

    let timeout =
        std::time::Duration::from_secs(state.config.scheduler.manual_check_timeout_secs);
    let record = state.runner.run_manual(target, timeout).await?;
    Ok(Json(record))
}

// ── Schedules ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpsertScheduleRequest {
    /// Omitted on create; an existing id updates that schedule.
    pub id: Option<ScheduleId>,
    pub owner: OwnerId,
    pub enabled: Option<bool>,
    pub interval_days: u32,
    pub execute_hour: u32,
}

/// Create or reconfigure a schedule. The timer is always re-anchored to
/// the next valid slot; the claimed-but-stale timestamp problem never
/// arises because `next_run_at` is written before returning.
pub async fn upsert_schedule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertScheduleRequest>,
) -> Result<Json<ScheduleState>, ApiError> {
    if req.interval_days < 1 {
        return Err(ApiError::bad_request("interval_days must be at least 1"));
    }
    if req.execute_hour > 23 {
        return Err(ApiError::bad_request("execute_hour must be 0-23"));
    }

    let now = Utc::now();
    let existing = match req.id {
        Some(id) => state.schedules.get(id).await?,
        None => None,
    };
    if req.id.is_some() && existing.is_none() {
        return Err(ApiError::not_found("schedule not found"));
    }

    let mut schedule = existing.unwrap_or(ScheduleState {
        id: ScheduleId::new(),
        owner: req.owner,
        enabled: true,
        interval_days: req.interval_days,
        execute_hour: req.execute_hour,
        excluded_targets: Default::default(),
        last_run_at: None,
        next_run_at: None,
    });
    schedule.enabled = req.enabled.unwrap_or(schedule.enabled);
    schedule.interval_days = req.interval_days;
    schedule.execute_hour = req.execute_hour;
    schedule.next_run_at = Some(state.clock.next_slot(now, schedule.execute_hour));

    // Apply plan limits up front so the stored state is already valid.
    let schedule = corrected_schedule(
        &state.schedules,
        &state.targets,
        &state.plans,
        state.clock,
        schedule,
        now,
    )
    .await?;
    state.schedules.upsert(schedule.clone()).await?;
    tracing::info!(
        schedule = %schedule.id,
        interval_days = schedule.interval_days,
        execute_hour = schedule.execute_hour,
        "schedule upserted"
    );
    Ok(Json(schedule))
}

/// All schedules for an owner, with plan-limit corrections applied on
/// the way out.
pub async fn owner_schedules(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<Vec<ScheduleState>>, ApiError> {
    let now = Utc::now();
    let mut corrected = Vec::new();
    for schedule in state.schedules.for_owner(owner).await? {
        corrected.push(
            corrected_schedule(
                &state.schedules,
                &state.targets,
                &state.plans,
                state.clock,
                schedule,
                now,
            )
            .await?,
        );
    }
    Ok(Json(corrected))
}

#[derive(Serialize)]
pub struct TickResponse {
    pub evaluated: usize,
    pub fired: usize,
    pub skipped_in_flight: usize,
    pub re_anchored: usize,
}

/// External trigger for a scheduler tick. Redundant with the internal
/// timer and safe to call concurrently with it.
pub async fn run_schedules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TickResponse>, ApiError> {
    let summary = state.scheduler.run_due(Utc::now()).await?;
    Ok(Json(TickResponse {
        evaluated: summary.evaluated,
        fired: summary.fired,
        skipped_in_flight: summary.skipped_in_flight,
        re_anchored: summary.re_anchored,
    }))
}

// ── Notifications ─────────────────────────────────────────────────

/// Delivery audit trail for an owner, newest first.
pub async fn owner_notifications(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<OwnerId>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<DeliveryRecord>>, ApiError> {
    let limit = params.limit.unwrap_or(50).min(500);
    let records = state.notification_history.for_owner(owner, limit).await?;
    Ok(Json(records))
}
