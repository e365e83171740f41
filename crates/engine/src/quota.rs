//! Manual-check quota guard.
//!
//! Two independent limits apply to manually triggered checks (scheduled
//! checks are exempt): a per-target rolling 60-minute cooldown and an
//! optional per-owner daily cap. Passing both records the attempt
//! immediately, so quota is consumed even if the check itself later fails.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use pagewatch_core::{OwnerId, TargetId};
use pagewatch_store::{IncrementOutcome, PlanSource, QuotaStore};

use crate::error::EngineError;

/// Rolling cooldown between manual checks of the same target. Independent
/// of calendar day: a check just before midnight still blocks one just
/// after.
pub const COOLDOWN_MINUTES: i64 = 60;

/// Gatekeeper in front of manual check triggers.
pub struct QuotaGuard {
    quotas: Arc<dyn QuotaStore>,
    plans: Arc<dyn PlanSource>,
}

impl QuotaGuard {
    pub fn new(quotas: Arc<dyn QuotaStore>, plans: Arc<dyn PlanSource>) -> Self {
        Self { quotas, plans }
    }

    /// Authorize one manual check of `target` by `owner` at `now`.
    ///
    /// On success the attempt is already recorded: `last_monitored_at`
    /// is updated and the daily counter incremented.
    ///
    /// # Errors
    ///
    /// [`EngineError::CooldownActive`] with the minutes remaining, or
    /// [`EngineError::DailyCapReached`] when the plan's daily cap is hit.
    pub async fn authorize(
        &self,
        owner: OwnerId,
        target: TargetId,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let plan = self.plans.plan_limits(owner).await?;

        if !plan.unlimited_manual {
            if let Some(last) = self.quotas.last_monitored(owner, target).await? {
                let elapsed = now - last;
                if elapsed < Duration::minutes(COOLDOWN_MINUTES) {
                    let remaining = Duration::minutes(COOLDOWN_MINUTES) - elapsed;
                    // Round up so "59m30s left" reads as 60, never 0.
                    let minutes_remaining = (remaining.num_seconds() + 59) / 60;
                    tracing::debug!(%owner, %target, minutes_remaining, "manual check in cooldown");
                    return Err(EngineError::CooldownActive { minutes_remaining });
                }
            }
        }

        let day = now.date_naive();
        match self
            .quotas
            .try_increment_daily(owner, day, plan.max_daily_manual_checks)
            .await?
        {
            IncrementOutcome::Incremented(count) => {
                tracing::debug!(%owner, count, "manual check counted");
            }
            IncrementOutcome::CapReached(count) => {
                tracing::info!(%owner, count, "daily manual-check cap reached");
                return Err(EngineError::DailyCapReached {
                    cap: plan.max_daily_manual_checks.unwrap_or(count),
                });
            }
        }

        self.quotas.record_monitored(owner, target, now).await?;
        Ok(())
    }
}
