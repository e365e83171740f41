//! Persistence layer for pagewatch.
//!
//! - [`artifact`]: content blobs (captures, diff visualizations) behind
//!   `object_store` (local filesystem, S3, or in-memory for tests)
//! - [`ledger`]: the append-only check history
//! - [`schedule`]: per-(owner, group) timer state
//! - [`quota`]: manual-check quota bookkeeping
//! - [`targets`]: the monitored-target registry
//! - [`plan`]: read-only plan-limit lookup
//!
//! The JSON-file repositories keep their working set in memory under a
//! lock and persist the whole map after every mutation; constructed
//! without a path they become purely in-memory stores for tests.

pub mod artifact;
pub mod error;
mod jsonfile;
pub mod ledger;
pub mod plan;
pub mod quota;
pub mod schedule;
pub mod targets;

pub use artifact::{ArtifactStore, ObjectArtifactStore};
pub use error::StoreError;
pub use ledger::{CheckLedger, JsonCheckLedger};
pub use plan::{PlanSource, StaticPlanSource};
pub use quota::{IncrementOutcome, JsonQuotaStore, QuotaStore};
pub use schedule::{JsonScheduleStore, ScheduleStore};
pub use targets::{JsonTargetStore, TargetStore};
