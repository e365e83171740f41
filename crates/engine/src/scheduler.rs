//! Scheduler state machine.
//!
//! A coarse timer (or an external "run due schedules" trigger) calls
//! [`Scheduler::run_due`], which evaluates every enabled schedule against
//! local wall-clock time, claims the due ones, and runs their targets.
//!
//! Claiming is what makes redundant triggers safe: the schedule id goes
//! into an in-memory registry AND a fresh future `next_run_at` is written
//! to the store before any check runs. A concurrent invocation in the same
//! process hits the registry; one in another process reads the advanced
//! timestamp. Worst case under a race is the timestamp advancing twice,
//! never two monitoring cycles.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use pagewatch_core::{LocalClock, ScheduleId, ScheduleState};
use pagewatch_store::{ScheduleStore, TargetStore};

use crate::check::CheckRunner;
use crate::error::EngineError;
use crate::inflight::InflightRegistry;

/// Per-tick due-ness verdict for one schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    NotDue,
    Due,
    /// `next_run_at` has passed but the wall-clock hour is wrong by more
    /// than the tick resolution: advance to the next correct slot instead
    /// of firing at the wrong time of day.
    ReAnchor,
}

/// What one `run_due` invocation did.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSummary {
    pub evaluated: usize,
    pub fired: usize,
    pub skipped_in_flight: usize,
    pub re_anchored: usize,
}

pub struct Scheduler {
    schedules: Arc<dyn ScheduleStore>,
    targets: Arc<dyn TargetStore>,
    runner: Arc<CheckRunner>,
    clock: LocalClock,
    tick_minutes: u32,
    running: InflightRegistry<ScheduleId>,
}

impl Scheduler {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        targets: Arc<dyn TargetStore>,
        runner: Arc<CheckRunner>,
        clock: LocalClock,
        tick_minutes: u32,
    ) -> Self {
        Self {
            schedules,
            targets,
            runner,
            clock,
            tick_minutes: tick_minutes.max(1),
            running: InflightRegistry::new(),
        }
    }

    fn tick_period(&self) -> Duration {
        Duration::minutes(self.tick_minutes as i64)
    }

    /// Evaluate all enabled schedules and run the due ones.
    ///
    /// Safe to call redundantly and concurrently from multiple triggers.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<TickSummary, EngineError> {
        let mut summary = TickSummary::default();

        for schedule in self.schedules.list_enabled().await? {
            summary.evaluated += 1;
            match evaluate(&self.clock, self.tick_period(), &schedule, now) {
                Decision::NotDue => {}
                Decision::ReAnchor => {
                    let mut state = schedule;
                    let slot = self.clock.next_slot(now, state.execute_hour);
                    tracing::info!(
                        schedule = %state.id,
                        next_run = %slot,
                        "wrong-hour overdue schedule re-anchored"
                    );
                    state.next_run_at = Some(slot);
                    self.schedules.upsert(state).await?;
                    summary.re_anchored += 1;
                }
                Decision::Due => {
                    if self.fire(schedule, now).await? {
                        summary.fired += 1;
                    } else {
                        summary.skipped_in_flight += 1;
                    }
                }
            }
        }

        tracing::debug!(
            evaluated = summary.evaluated,
            fired = summary.fired,
            skipped = summary.skipped_in_flight,
            re_anchored = summary.re_anchored,
            "scheduler tick complete"
        );
        Ok(summary)
    }

    /// Claim and run one due schedule. Returns false when another
    /// invocation already holds the claim.
    async fn fire(&self, mut state: ScheduleState, now: DateTime<Utc>) -> Result<bool, EngineError> {
        let Some(_claim) = self.running.try_claim(state.id) else {
            tracing::debug!(schedule = %state.id, "schedule already running, skipping");
            return Ok(false);
        };

        // Claim write before any work: a crash mid-cycle leaves a future
        // timestamp, so the next trigger does not re-run this cycle.
        state.next_run_at = Some(self.clock.slot_after(now, state.interval_days, state.execute_hour));
        self.schedules.upsert(state.clone()).await?;

        let targets = self.targets.for_owner(state.owner).await?;
        let monitored: Vec<_> = targets
            .into_iter()
            .filter(|t| !state.excluded_targets.contains(&t.id))
            .collect();

        tracing::info!(
            schedule = %state.id,
            owner = %state.owner,
            targets = monitored.len(),
            "monitoring cycle started"
        );

        let checks = monitored.iter().map(|target| {
            let runner = Arc::clone(&self.runner);
            async move {
                match runner.run_check(target).await {
                    Ok(record) => {
                        tracing::debug!(target = %target.id, status = ?record.status, "check done");
                    }
                    Err(EngineError::TargetBusy) => {
                        tracing::debug!(target = %target.id, "target busy, deferred to next cycle");
                    }
                    Err(e) => {
                        tracing::warn!(target = %target.id, error = %e, "scheduled check failed");
                    }
                }
            }
        });
        futures::future::join_all(checks).await;

        state.last_run_at = Some(now);
        self.schedules.upsert(state).await?;
        Ok(true)
    }
}

/// The due-ness predicate, on explicit wall-clock fields.
pub(crate) fn evaluate(
    clock: &LocalClock,
    tick_period: Duration,
    schedule: &ScheduleState,
    now: DateTime<Utc>,
) -> Decision {
    let (_, local_hour) = clock.wall(now);

    match schedule.next_run_at {
        Some(next) if next > now => Decision::NotDue,
        Some(next) => {
            let gap = hour_gap(local_hour, schedule.execute_hour);
            if gap > 1 {
                Decision::ReAnchor
            } else if gap == 0 || now - next > tick_period {
                // Right hour, or missed-tick catch-up within the adjacent hour.
                Decision::Due
            } else {
                Decision::NotDue
            }
        }
        // No reference point: only an exact hour match fires.
        None => {
            if local_hour == schedule.execute_hour {
                Decision::Due
            } else {
                Decision::NotDue
            }
        }
    }
}

/// Circular distance between two hours of day.
fn hour_gap(a: u32, b: u32) -> u32 {
    let d = (a as i32 - b as i32).rem_euclid(24) as u32;
    d.min(24 - d)
}
