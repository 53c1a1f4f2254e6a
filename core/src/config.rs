use crate::catalog::{self, ProductSpec};
use crate::error::{SimError, SimResult};
use crate::types::{Iteration, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How shoppers pick which reviews to examine. Most-recent-N is the
/// reference policy; the strategy stays configurable because the
/// sampling rule changes what temporal signatures a persona can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    #[default]
    MostRecent,
    Random,
    FullPool,
}

/// Reviews examined per shopper, by persona.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReviewsRead {
    pub impulsive: usize,
    pub careful: usize,
    pub skeptical: usize,
}

/// Knobs for the persona decision policies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Impulsive buys when the sampled average rating clears this.
    pub impulsive_threshold: f64,
    /// Residual impulse-buy probability below the threshold.
    pub impulse_buy_probability: f64,
    /// Composite-score thresholds for the deliberating personas.
    pub careful_threshold: f64,
    pub skeptical_threshold: f64,
    /// Minimum count of same-iteration 5-star generic reviews that
    /// flags a sample as a suspected burst.
    pub suspicion_cluster: usize,
    /// Multiplier applied to the rating weight once a sample is
    /// flagged. Dampens, never zeroes: price/quality still counts.
    pub suspicion_damping: f64,
    /// Half-width of the uniform noise added to composite scores.
    pub decision_noise: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            impulsive_threshold: 4.0,
            impulse_buy_probability: 0.05,
            careful_threshold: 0.60,
            skeptical_threshold: 0.60,
            suspicion_cluster: 4,
            suspicion_damping: 0.3,
            decision_noise: 0.15,
        }
    }
}

/// Text-generation collaborator settings. The timeout belongs to the
/// collaborator; the core only carries it here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub review_temperature: f64,
    pub decision_temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_secs: 180,
            review_temperature: 0.7,
            decision_temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub total_iterations: Iteration,
    /// Genuine reviews per product per iteration, split across the
    /// three personalities (remainder goes to Balanced).
    pub genuine_reviews_per_product: u32,
    pub burst_iterations: Vec<Iteration>,
    /// Fake reviews injected per target product at each burst iteration.
    pub burst_volume_per_target: BTreeMap<Iteration, u32>,
    /// Flat per-target volume for every iteration after the last burst.
    pub maintenance_volume_per_target: u32,
    pub campaign_targets: Vec<ProductId>,
    pub shoppers_per_persona_per_product: u32,
    pub reviews_read: ReviewsRead,
    #[serde(default)]
    pub sampling: SamplingStrategy,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    pub catalog: Vec<ProductSpec>,
}

impl SimConfig {
    /// Load a scenario file (JSON). In tests, use `default_test()`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject contradictory parameters before any simulation step runs.
    pub fn validate(&self) -> SimResult<()> {
        if self.total_iterations == 0 {
            return Err(SimError::config("total_iterations must be at least 1"));
        }
        if self.catalog.is_empty() {
            return Err(SimError::config("catalog must contain at least one product"));
        }
        let mut seen = std::collections::HashSet::new();
        for product in &self.catalog {
            if !seen.insert(product.id) {
                return Err(SimError::config(format!(
                    "duplicate product id {} in catalog",
                    product.id
                )));
            }
        }
        for &iteration in &self.burst_iterations {
            if iteration == 0 || iteration > self.total_iterations {
                return Err(SimError::config(format!(
                    "burst iteration {iteration} outside run range 1..={}",
                    self.total_iterations
                )));
            }
            if !self.burst_volume_per_target.contains_key(&iteration) {
                return Err(SimError::config(format!(
                    "burst iteration {iteration} has no configured volume"
                )));
            }
        }
        for &iteration in self.burst_volume_per_target.keys() {
            if !self.burst_iterations.contains(&iteration) {
                return Err(SimError::config(format!(
                    "burst volume configured for non-burst iteration {iteration}"
                )));
            }
        }
        for &target in &self.campaign_targets {
            if !seen.contains(&target) {
                return Err(SimError::config(format!(
                    "campaign target {target} is not in the catalog"
                )));
            }
        }
        if !self.campaign_targets.is_empty()
            && self.burst_iterations.is_empty()
            && self.maintenance_volume_per_target > 0
        {
            return Err(SimError::config(
                "maintenance volume configured with no burst iterations",
            ));
        }
        if self.reviews_read.impulsive == 0
            || self.reviews_read.careful == 0
            || self.reviews_read.skeptical == 0
        {
            return Err(SimError::config("every persona must read at least one review"));
        }
        Ok(())
    }

    /// The reference study's parameters, scaled down for fast tests:
    /// 20 iterations, bursts at 4 and 5 (50 fakes per target), flat
    /// maintenance of 5 per target, targets 3 and 5.
    pub fn default_test() -> Self {
        Self {
            total_iterations: 20,
            genuine_reviews_per_product: 6,
            burst_iterations: vec![4, 5],
            burst_volume_per_target: [(4, 50), (5, 50)].into(),
            maintenance_volume_per_target: 5,
            campaign_targets: vec![3, 5],
            shoppers_per_persona_per_product: 4,
            reviews_read: ReviewsRead {
                impulsive: 3,
                careful: 10,
                skeptical: 15,
            },
            sampling: SamplingStrategy::MostRecent,
            decision: DecisionConfig::default(),
            generation: GenerationConfig::default(),
            catalog: catalog::default_catalog(),
        }
    }
}
