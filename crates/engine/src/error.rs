//! Engine error taxonomy.
//!
//! Every variant surfaced to an owner-facing caller renders as a
//! human-readable sentence. Quota rejections carry their remaining-time
//! or remaining-count hint in the message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Capture(#[from] pagewatch_capture::CaptureError),

    #[error(transparent)]
    Store(#[from] pagewatch_store::StoreError),

    #[error(transparent)]
    Diff(#[from] pagewatch_diff::DiffError),

    #[error(transparent)]
    Notify(#[from] pagewatch_notify::NotifyError),

    #[error("target {0} not found")]
    TargetNotFound(pagewatch_core::TargetId),

    #[error("a check is already running for this target")]
    TargetBusy,

    #[error("this target was checked recently; try again in {minutes_remaining} minute(s)")]
    CooldownActive { minutes_remaining: i64 },

    #[error("daily manual-check limit of {cap} reached (0 remaining today)")]
    DailyCapReached { cap: u32 },

    #[error("manual check timed out after {secs}s; it will finish in the background")]
    Timeout { secs: u64 },

    #[error("{0}")]
    Internal(String),
}
