//! Read-only plan-limit lookup.
//!
//! Plan and billing data live in an external system; the engine only
//! reads the limits that shape scheduling and manual-check quotas.

use std::collections::HashMap;

use pagewatch_core::{OwnerId, PlanLimits};

use crate::error::StoreError;

#[async_trait::async_trait]
pub trait PlanSource: Send + Sync {
    async fn plan_limits(&self, owner: OwnerId) -> Result<PlanLimits, StoreError>;
}

/// Fixed plan table with optional per-owner overrides. Suitable for
/// single-tenant deployments and tests; a billing-system client slots in
/// behind the same trait.
#[derive(Debug, Default)]
pub struct StaticPlanSource {
    default: PlanLimits,
    overrides: HashMap<OwnerId, PlanLimits>,
}

impl StaticPlanSource {
    pub fn new(default: PlanLimits) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, owner: OwnerId, limits: PlanLimits) -> Self {
        self.overrides.insert(owner, limits);
        self
    }
}

#[async_trait::async_trait]
impl PlanSource for StaticPlanSource {
    async fn plan_limits(&self, owner: OwnerId) -> Result<PlanLimits, StoreError> {
        Ok(self.overrides.get(&owner).copied().unwrap_or(self.default))
    }
}
