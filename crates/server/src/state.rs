use std::sync::Arc;

use pagewatch_core::{Config, LocalClock};
use pagewatch_engine::{CheckRunner, QuotaGuard, Scheduler};
use pagewatch_notify::NotificationHistory;
use pagewatch_store::{CheckLedger, PlanSource, ScheduleStore, TargetStore};

pub struct AppState {
    pub config: Config,
    pub clock: LocalClock,
    pub targets: Arc<dyn TargetStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub ledger: Arc<dyn CheckLedger>,
    pub plans: Arc<dyn PlanSource>,
    pub notification_history: Arc<dyn NotificationHistory>,
    pub runner: Arc<CheckRunner>,
    pub scheduler: Arc<Scheduler>,
    pub quota: Arc<QuotaGuard>,
}
