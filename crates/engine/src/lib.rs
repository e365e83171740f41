//! Change-detection and scheduling engine.
//!
//! This crate ties the leaf crates together:
//! - [`check`]: the Check pipeline (liveness, capture, diff, classify,
//!   persist, rotate, notify)
//! - [`scheduler`]: the per-schedule timer state machine with claim-based
//!   concurrency safety
//! - [`quota`]: the manual-check quota guard
//! - [`correct`]: plan-limit auto-correction on schedule reads
//! - [`inflight`]: the in-memory claim registries
//! - [`rotation`]: baseline rotation for unchanged observations

pub mod check;
pub mod correct;
pub mod error;
pub mod inflight;
pub mod quota;
pub mod rotation;
pub mod scheduler;

pub use check::CheckRunner;
pub use correct::corrected_schedule;
pub use error::EngineError;
pub use inflight::{InflightGuard, InflightRegistry};
pub use quota::QuotaGuard;
pub use scheduler::{Scheduler, TickSummary};
