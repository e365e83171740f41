//! Plan-limit auto-correction.
//!
//! Plan limits change outside the engine (upgrades, downgrades). Instead
//! of a migration step, every schedule read passes through here: stored
//! state that violates the owner's current limits is corrected and
//! persisted on the spot, and the timer is re-anchored.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use pagewatch_core::{LocalClock, ScheduleState};
use pagewatch_store::{PlanSource, ScheduleStore, TargetStore};

use crate::error::EngineError;

/// Fetch a schedule with plan-limit corrections applied.
///
/// Raises `interval_days` to the plan minimum and excludes oldest-id
/// excess targets beyond the plan's target cap. A corrected schedule is
/// persisted and its `next_run_at` re-anchored to the next valid slot.
pub async fn corrected_schedule(
    schedules: &Arc<dyn ScheduleStore>,
    targets: &Arc<dyn TargetStore>,
    plans: &Arc<dyn PlanSource>,
    clock: LocalClock,
    mut state: ScheduleState,
    now: DateTime<Utc>,
) -> Result<ScheduleState, EngineError> {
    let limits = plans.plan_limits(state.owner).await?;
    let mut corrected = false;

    if state.interval_days < limits.min_interval_days {
        tracing::info!(
            schedule = %state.id,
            from = state.interval_days,
            to = limits.min_interval_days,
            "raising interval to plan minimum"
        );
        state.interval_days = limits.min_interval_days;
        corrected = true;
    }

    let owned = targets.for_owner(state.owner).await?;
    let monitored: Vec<_> = owned
        .iter()
        .filter(|t| !state.excluded_targets.contains(&t.id))
        .collect();
    if monitored.len() > limits.max_targets {
        let excess = monitored.len() - limits.max_targets;
        // `for_owner` is id-ordered, so the first entries are the oldest ids.
        for target in monitored.iter().take(excess) {
            state.excluded_targets.insert(target.id);
        }
        tracing::info!(
            schedule = %state.id,
            excluded = excess,
            cap = limits.max_targets,
            "excluding targets beyond plan cap"
        );
        corrected = true;
    }

    if corrected {
        state.next_run_at = Some(clock.next_slot(now, state.execute_hour));
        schedules.upsert(state.clone()).await?;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::{
        MonitoredTarget, OwnerId, PlanLimits, ScheduleId, TargetId, TargetKind,
    };
    use pagewatch_store::{JsonScheduleStore, JsonTargetStore, StaticPlanSource};
    use std::collections::HashSet;

    fn schedule(owner: OwnerId, interval_days: u32) -> ScheduleState {
        ScheduleState {
            id: ScheduleId::new(),
            owner,
            enabled: true,
            interval_days,
            execute_hour: 9,
            excluded_targets: HashSet::new(),
            last_run_at: None,
            next_run_at: None,
        }
    }

    fn target(owner: OwnerId) -> MonitoredTarget {
        MonitoredTarget {
            id: TargetId::new(),
            owner,
            kind: TargetKind::Page {
                url: "https://example.com".into(),
            },
            label: "lp".into(),
            created_at: Utc::now(),
        }
    }

    struct Fixture {
        schedules: Arc<dyn ScheduleStore>,
        targets_store: Arc<JsonTargetStore>,
        targets: Arc<dyn TargetStore>,
        plans: Arc<dyn PlanSource>,
    }

    fn fixture(limits: PlanLimits) -> Fixture {
        let targets_store = Arc::new(JsonTargetStore::in_memory());
        Fixture {
            schedules: Arc::new(JsonScheduleStore::in_memory()),
            targets: targets_store.clone(),
            targets_store,
            plans: Arc::new(StaticPlanSource::new(limits)),
        }
    }

    #[tokio::test]
    async fn interval_below_minimum_is_raised_and_persisted() {
        let f = fixture(PlanLimits {
            min_interval_days: 7,
            ..Default::default()
        });
        let owner = OwnerId::new();
        let state = schedule(owner, 1);
        f.schedules.upsert(state.clone()).await.unwrap();

        let now = Utc::now();
        let corrected = corrected_schedule(
            &f.schedules,
            &f.targets,
            &f.plans,
            LocalClock::utc(),
            state.clone(),
            now,
        )
        .await
        .unwrap();

        assert_eq!(corrected.interval_days, 7);
        // Timer re-anchored strictly into the future.
        assert!(corrected.next_run_at.unwrap() > now);
        let stored = f.schedules.get(state.id).await.unwrap().unwrap();
        assert_eq!(stored.interval_days, 7);
    }

    #[tokio::test]
    async fn excess_targets_are_excluded_oldest_id_first() {
        let f = fixture(PlanLimits {
            max_targets: 2,
            ..Default::default()
        });
        let owner = OwnerId::new();
        for _ in 0..4 {
            f.targets_store.insert(target(owner)).await.unwrap();
        }
        let state = schedule(owner, 1);
        f.schedules.upsert(state.clone()).await.unwrap();

        let corrected = corrected_schedule(
            &f.schedules,
            &f.targets,
            &f.plans,
            LocalClock::utc(),
            state,
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(corrected.excluded_targets.len(), 2);
        let owned = f.targets.for_owner(owner).await.unwrap();
        // The two oldest ids are the excluded ones.
        assert!(corrected.excluded_targets.contains(&owned[0].id));
        assert!(corrected.excluded_targets.contains(&owned[1].id));
        assert!(!corrected.excluded_targets.contains(&owned[3].id));
    }

    #[tokio::test]
    async fn compliant_schedule_is_untouched() {
        let f = fixture(PlanLimits::default());
        let owner = OwnerId::new();
        let state = schedule(owner, 3);
        f.schedules.upsert(state.clone()).await.unwrap();

        let corrected = corrected_schedule(
            &f.schedules,
            &f.targets,
            &f.plans,
            LocalClock::utc(),
            state.clone(),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(corrected.interval_days, 3);
        assert!(corrected.next_run_at.is_none());
    }
}
