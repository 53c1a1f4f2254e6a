//! Campaign schedule — the attack timeline as a pure function.
//!
//! RULE: `phase()` and `fake_volume()` are side-effect-free and
//! idempotent. Re-querying the same iteration always returns the same
//! plan, so the schedule is testable with no engine running. Volumes
//! are per-target and derived from the iteration alone, never from
//! in-flight market state.

use crate::config::SimConfig;
use crate::types::{Iteration, ProductId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignPhase {
    Baseline,
    Burst,
    Maintenance,
}

impl CampaignPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Burst => "burst",
            Self::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CampaignSchedule {
    burst_volume_per_target: BTreeMap<Iteration, u32>,
    maintenance_volume_per_target: u32,
    targets: Vec<ProductId>,
    last_burst: Option<Iteration>,
}

impl CampaignSchedule {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            burst_volume_per_target: config.burst_volume_per_target.clone(),
            maintenance_volume_per_target: config.maintenance_volume_per_target,
            targets: config.campaign_targets.clone(),
            last_burst: config.burst_iterations.iter().copied().max(),
        }
    }

    pub fn targets(&self) -> &[ProductId] {
        &self.targets
    }

    pub fn is_target(&self, product_id: ProductId) -> bool {
        self.targets.contains(&product_id)
    }

    /// Classify an iteration. Iterations in a gap between two
    /// non-contiguous bursts count as baseline (zero volume).
    pub fn phase(&self, iteration: Iteration) -> CampaignPhase {
        if self.burst_volume_per_target.contains_key(&iteration) {
            return CampaignPhase::Burst;
        }
        match self.last_burst {
            Some(last) if iteration > last => CampaignPhase::Maintenance,
            _ => CampaignPhase::Baseline,
        }
    }

    /// Fake reviews to inject for one product at one iteration.
    /// Zero for every non-target, in every phase.
    pub fn fake_volume(&self, iteration: Iteration, product_id: ProductId) -> u32 {
        if !self.is_target(product_id) {
            return 0;
        }
        match self.phase(iteration) {
            CampaignPhase::Baseline => 0,
            CampaignPhase::Burst => self
                .burst_volume_per_target
                .get(&iteration)
                .copied()
                .unwrap_or(0),
            CampaignPhase::Maintenance => self.maintenance_volume_per_target,
        }
    }
}
