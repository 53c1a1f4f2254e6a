//! Shopper population — Phase 2 of every iteration.
//!
//! Every shopper examines a persona-sized slice of the product's
//! review pool, applies its decision policy, and records exactly one
//! transaction (buy or no-buy). Shoppers never post reviews, and the
//! review pool they read is the one Phase 1 finished writing this
//! iteration — the phase ordering is what makes the campaign effect
//! measurable.
//!
//! The suspicion heuristic is observable-only: a skeptical shopper
//! sees ratings, texts, and posting iterations, never the ground-truth
//! `is_fake` flag. That flag is carried on the transaction record for
//! the analysis pass alone.

use crate::{
    catalog::ProductSpec,
    config::{DecisionConfig, ReviewsRead, SamplingStrategy},
    error::SimResult,
    event::SimEvent,
    reviewer::ReviewRecord,
    rng::SubsystemRng,
    subsystem::{PhaseContext, SimSubsystem},
    textgen::{generate_with_retry, mentions_product_attributes, GenContext, PromptKind},
    types::{EntityId, Iteration, ProductId, RunId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Impulsive,
    Careful,
    Skeptical,
}

/// Iteration order within a product. Stable: the RNG stream depends
/// on it.
pub const PERSONAS: [Persona; 3] = [Persona::Impulsive, Persona::Careful, Persona::Skeptical];

impl Persona {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Impulsive => "impulsive",
            Self::Careful => "careful",
            Self::Skeptical => "skeptical",
        }
    }

    pub fn reviews_read(&self, reads: &ReviewsRead) -> usize {
        match self {
            Self::Impulsive => reads.impulsive,
            Self::Careful => reads.careful,
            Self::Skeptical => reads.skeptical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Buy,
    NoBuy,
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::NoBuy => "no_buy",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

/// One shopper's recorded purchase decision. Immutable once written.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub txn_id: EntityId,
    pub product_id: ProductId,
    pub persona: Persona,
    pub decision: Decision,
    /// How many reviews this shopper actually examined (the sample may
    /// fall short of the persona's read count early in the run).
    pub reviews_read: u32,
    pub fake_in_sample: u32,
    pub fake_fraction: f64,
    pub rationale: String,
    pub iteration: Iteration,
}

/// What one shopper extracted from its review sample before deciding.
#[derive(Debug, Clone, Copy)]
struct SampleView {
    /// Mean rating over the sample, `None` on an empty sample.
    avg_rating: Option<f64>,
    sample_size: u32,
    fake_in_sample: u32,
    /// Largest same-iteration cluster of generic five-star reviews.
    /// This is the burst signature skeptics key on.
    max_generic_cluster: usize,
}

fn summarize_sample(sample: &[ReviewRecord]) -> SampleView {
    let avg_rating = if sample.is_empty() {
        None
    } else {
        Some(sample.iter().map(|r| f64::from(r.rating)).sum::<f64>() / sample.len() as f64)
    };
    let fake_in_sample = sample.iter().filter(|r| r.is_fake).count() as u32;

    let mut generic_by_iteration: HashMap<Iteration, usize> = HashMap::new();
    for review in sample {
        if review.rating == 5 && !mentions_product_attributes(&review.text) {
            *generic_by_iteration.entry(review.iteration).or_default() += 1;
        }
    }
    let max_generic_cluster = generic_by_iteration.values().copied().max().unwrap_or(0);

    SampleView {
        avg_rating,
        sample_size: sample.len() as u32,
        fake_in_sample,
        max_generic_cluster,
    }
}

/// Normalize a 1..=5 star average onto [0, 1].
fn rating_norm(avg: f64) -> f64 {
    ((avg - 1.0) / 4.0).clamp(0.0, 1.0)
}

/// Normalize quality-per-price onto [0, 1]. The catalog's spread tops
/// out near 3 quality points per 100k Rupiah, so /4 leaves headroom.
fn value_norm(product: &ProductSpec) -> f64 {
    (product.quality_per_price() / 4.0).clamp(0.0, 1.0)
}

fn decide(
    persona: Persona,
    product: &ProductSpec,
    view: &SampleView,
    knobs: &DecisionConfig,
    rng: &mut SubsystemRng,
) -> Decision {
    match persona {
        Persona::Impulsive => {
            // Rating is the only signal; price never enters.
            match view.avg_rating {
                Some(avg) if avg >= knobs.impulsive_threshold => Decision::Buy,
                _ if rng.chance(knobs.impulse_buy_probability) => Decision::Buy,
                _ => Decision::NoBuy,
            }
        }
        Persona::Careful | Persona::Skeptical => {
            let suspicious = persona == Persona::Skeptical
                && view.max_generic_cluster >= knobs.suspicion_cluster;
            let rating_weight = if suspicious {
                0.6 * knobs.suspicion_damping
            } else {
                0.6
            };
            let rating_component = view.avg_rating.map_or(0.0, rating_norm);
            let noise = (rng.next_f64() * 2.0 - 1.0) * knobs.decision_noise;
            let score = rating_weight * rating_component + 0.4 * value_norm(product) + noise;
            let threshold = match persona {
                Persona::Careful => knobs.careful_threshold,
                _ => knobs.skeptical_threshold,
            };
            if score >= threshold {
                Decision::Buy
            } else {
                Decision::NoBuy
            }
        }
    }
}

pub struct ShopperPopulation {
    run_id: RunId,
}

impl ShopperPopulation {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id }
    }

    /// Draw one shopper's review sample per the configured strategy.
    /// A pool smaller than the read count yields the whole pool.
    fn sample_reviews(
        &self,
        ctx: &PhaseContext<'_>,
        product_id: ProductId,
        read_count: usize,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<ReviewRecord>> {
        match ctx.config.sampling {
            SamplingStrategy::MostRecent => {
                ctx.store
                    .recent_reviews(&self.run_id, product_id, read_count as u32)
            }
            SamplingStrategy::Random => {
                let mut pool = ctx.store.all_reviews(&self.run_id, product_id)?;
                rng.shuffle(&mut pool);
                pool.truncate(read_count);
                Ok(pool)
            }
            SamplingStrategy::FullPool => ctx.store.all_reviews(&self.run_id, product_id),
        }
    }

    fn run_shopper(
        &self,
        ctx: &mut PhaseContext<'_>,
        product: &ProductSpec,
        persona: Persona,
        iteration: Iteration,
        rng: &mut SubsystemRng,
    ) -> SimResult<Decision> {
        let read_count = persona.reviews_read(&ctx.config.reviews_read);
        let sample = self.sample_reviews(ctx, product.id, read_count, rng)?;
        let view = summarize_sample(&sample);
        let decision = decide(persona, product, &view, &ctx.config.decision, rng);

        let fake_fraction = if view.sample_size == 0 {
            0.0
        } else {
            f64::from(view.fake_in_sample) / f64::from(view.sample_size)
        };
        let gen_ctx = GenContext {
            product,
            personality: None,
            persona: Some(persona),
            decision: Some(decision),
            fake_fraction: Some(fake_fraction),
        };
        let rationale = generate_with_retry(
            ctx.textgen,
            PromptKind::ShopperRationale,
            &gen_ctx,
            ctx.config.generation.decision_temperature,
            ctx.config.generation.max_retries,
        )?;

        let record = TransactionRecord {
            txn_id: Uuid::new_v4().to_string(),
            product_id: product.id,
            persona,
            decision,
            reviews_read: view.sample_size,
            fake_in_sample: view.fake_in_sample,
            fake_fraction,
            rationale,
            iteration,
        };
        ctx.store.insert_txn(&self.run_id, &record)?;
        Ok(decision)
    }
}

impl SimSubsystem for ShopperPopulation {
    fn name(&self) -> &'static str {
        "shopper"
    }

    fn update(
        &mut self,
        iteration: Iteration,
        ctx: &mut PhaseContext<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let per_persona = ctx.config.shoppers_per_persona_per_product;
        if per_persona == 0 {
            log::warn!("iteration {iteration}: zero shoppers configured");
            events.push(SimEvent::EmptyPopulationObserved {
                iteration,
                population: "shoppers".into(),
            });
            return Ok(events);
        }

        let catalog: Vec<ProductSpec> = ctx.catalog.to_vec();
        for product in &catalog {
            for persona in PERSONAS {
                let mut buys = 0u32;
                for _ in 0..per_persona {
                    let decision = self.run_shopper(ctx, product, persona, iteration, rng)?;
                    if decision.is_buy() {
                        buys += 1;
                    }
                }
                events.push(SimEvent::DecisionsRecorded {
                    iteration,
                    product_id: product.id,
                    persona: persona.name().to_string(),
                    buys,
                    total: per_persona,
                });
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::config::DecisionConfig;
    use crate::reviewer::{AuthorKind, Personality};
    use crate::rng::{RngBank, SubsystemSlot};

    fn review(rating: u8, text: &str, is_fake: bool, iteration: Iteration) -> ReviewRecord {
        ReviewRecord {
            review_id: format!("r-{rating}-{iteration}"),
            product_id: 1,
            author: if is_fake {
                AuthorKind::Fake
            } else {
                AuthorKind::Genuine(Personality::Balanced)
            },
            rating,
            text: text.to_string(),
            is_fake,
            iteration,
        }
    }

    #[test]
    fn generic_five_star_cluster_is_detected_per_iteration() {
        // Four generic five-stars in one iteration trip the detector.
        let sample: Vec<ReviewRecord> = (0..4)
            .map(|_| review(5, "Best purchase ever! Highly recommend!", true, 6))
            .chain(std::iter::once(review(
                3,
                "The bass is decent but the build creaks.",
                false,
                5,
            )))
            .collect();
        let view = summarize_sample(&sample);
        assert_eq!(view.max_generic_cluster, 4);
        assert_eq!(view.fake_in_sample, 4);
    }

    #[test]
    fn spread_out_generic_reviews_do_not_cluster() {
        // Same four fakes spread over four iterations: max cluster is 1.
        let sample: Vec<ReviewRecord> = (0..4)
            .map(|i| review(5, "Amazing! Perfect! Great value!", true, i))
            .collect();
        let view = summarize_sample(&sample);
        assert_eq!(view.max_generic_cluster, 1);
    }

    #[test]
    fn specific_five_stars_never_look_suspicious() {
        let sample: Vec<ReviewRecord> = (0..5)
            .map(|_| review(5, "The bass and battery life are superb.", false, 3))
            .collect();
        let view = summarize_sample(&sample);
        assert_eq!(view.max_generic_cluster, 0);
    }

    #[test]
    fn impulsive_buys_on_high_average_regardless_of_price() {
        let catalog = default_catalog();
        let expensive = catalog.iter().find(|p| p.id == 4).unwrap();
        let mut rng = RngBank::new(3).for_subsystem(SubsystemSlot::Shopper);
        let view = SampleView {
            avg_rating: Some(4.6),
            sample_size: 3,
            fake_in_sample: 0,
            max_generic_cluster: 0,
        };
        let decision = decide(
            Persona::Impulsive,
            expensive,
            &view,
            &DecisionConfig::default(),
            &mut rng,
        );
        assert_eq!(decision, Decision::Buy);
    }

    #[test]
    fn impulsive_below_threshold_rarely_buys() {
        let catalog = default_catalog();
        let product = &catalog[0];
        let mut rng = RngBank::new(11).for_subsystem(SubsystemSlot::Shopper);
        let view = SampleView {
            avg_rating: Some(3.2),
            sample_size: 3,
            fake_in_sample: 0,
            max_generic_cluster: 0,
        };
        let knobs = DecisionConfig::default();
        let buys = (0..1000)
            .filter(|_| decide(Persona::Impulsive, product, &view, &knobs, &mut rng).is_buy())
            .count();
        // Residual impulse probability is 0.05; allow generous slack.
        assert!(buys > 0, "impulse buys must still occur");
        assert!(buys < 150, "below-threshold buy rate too high: {buys}/1000");
    }

    #[test]
    fn suspicion_dampens_rating_but_skeptics_still_buy_sometimes() {
        let catalog = default_catalog();
        // Target 3 (BudgetBeats) has the best quality-per-price, so the
        // value term keeps some skeptical buys alive under suspicion.
        let target = catalog.iter().find(|p| p.id == 3).unwrap();
        let knobs = DecisionConfig::default();
        let suspicious_view = SampleView {
            avg_rating: Some(4.8),
            sample_size: 15,
            fake_in_sample: 10,
            max_generic_cluster: 8,
        };
        let clean_view = SampleView {
            avg_rating: Some(4.8),
            sample_size: 15,
            fake_in_sample: 0,
            max_generic_cluster: 0,
        };

        let mut rng = RngBank::new(21).for_subsystem(SubsystemSlot::Shopper);
        let suspicious_buys = (0..1000)
            .filter(|_| decide(Persona::Skeptical, target, &suspicious_view, &knobs, &mut rng).is_buy())
            .count();
        let clean_buys = (0..1000)
            .filter(|_| decide(Persona::Skeptical, target, &clean_view, &knobs, &mut rng).is_buy())
            .count();

        assert!(
            suspicious_buys < clean_buys,
            "suspicion must reduce buys: {suspicious_buys} vs {clean_buys}"
        );
        assert!(suspicious_buys > 0, "dampening must not zero out buys");
    }

    #[test]
    fn careful_weighs_value_where_impulsive_ignores_it() {
        let catalog = default_catalog();
        let overpriced = catalog.iter().find(|p| p.id == 4).unwrap();
        let bargain = catalog.iter().find(|p| p.id == 3).unwrap();
        let knobs = DecisionConfig::default();
        let view = SampleView {
            avg_rating: Some(4.2),
            sample_size: 10,
            fake_in_sample: 0,
            max_generic_cluster: 0,
        };

        let mut rng = RngBank::new(5).for_subsystem(SubsystemSlot::Shopper);
        let bargain_buys = (0..500)
            .filter(|_| decide(Persona::Careful, bargain, &view, &knobs, &mut rng).is_buy())
            .count();
        let overpriced_buys = (0..500)
            .filter(|_| decide(Persona::Careful, overpriced, &view, &knobs, &mut rng).is_buy())
            .count();
        assert!(
            bargain_buys > overpriced_buys,
            "careful shoppers must prefer better value: {bargain_buys} vs {overpriced_buys}"
        );
    }

    #[test]
    fn empty_sample_yields_no_signal() {
        let view = summarize_sample(&[]);
        assert_eq!(view.avg_rating, None);
        assert_eq!(view.sample_size, 0);
        assert_eq!(view.max_generic_cluster, 0);
    }
}
