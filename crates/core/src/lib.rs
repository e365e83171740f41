//! Shared domain types, configuration, and time arithmetic for pagewatch.

pub mod config;
pub mod localtime;
pub mod types;

pub use config::Config;
pub use localtime::LocalClock;
pub use types::{
    ChangeCategory, CheckKind, CheckRecord, CheckStatus, MonitoredTarget, OwnerId, PlanLimits,
    QuotaRecord, ScheduleId, ScheduleState, TargetClass, TargetId, TargetKind,
};
