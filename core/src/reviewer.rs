//! Reviewer population — Phase 1 of every iteration.
//!
//! This subsystem:
//!   1. Posts the configured count of genuine reviews per product,
//!      split evenly across the three personalities (remainder to
//!      Balanced), in a per-seed-deterministic shuffled order.
//!   2. Consults the campaign schedule and injects the scheduled fake
//!      volume against each target product.
//!
//! Every review is appended to Market State (running mean) and to the
//! Event Log, in generation order. Reviews are never edited or removed.

use crate::{
    campaign::CampaignSchedule,
    catalog::ProductSpec,
    error::{SimError, SimResult},
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::{PhaseContext, SimSubsystem},
    textgen::{generate_with_retry, GenContext, PromptKind},
    types::{EntityId, Iteration, ProductId, RunId},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Critical,
    Balanced,
    Lenient,
}

impl Personality {
    /// Rating bias applied on top of the quality-derived base score.
    pub fn bias(&self) -> i64 {
        match self {
            Self::Critical => -1,
            Self::Balanced => 0,
            Self::Lenient => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Balanced => "balanced",
            Self::Lenient => "lenient",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorKind {
    Genuine(Personality),
    Fake,
}

impl AuthorKind {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Genuine(_) => "genuine",
            Self::Fake => "fake",
        }
    }

    pub fn personality(&self) -> Option<Personality> {
        match self {
            Self::Genuine(p) => Some(*p),
            Self::Fake => None,
        }
    }
}

/// One immutable review, permanently tied to one product and one
/// iteration.
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub review_id: EntityId,
    pub product_id: ProductId,
    pub author: AuthorKind,
    pub rating: u8,
    pub text: String,
    pub is_fake: bool,
    pub iteration: Iteration,
}

/// Build the personality sequence for one product and iteration:
/// an even three-way split, extras to Balanced, then shuffled so the
/// posting order carries no personality signature.
pub fn personality_sequence(count: u32, rng: &mut SubsystemRng) -> Vec<Personality> {
    let per = count / 3;
    let remainder = count % 3;
    let mut sequence = Vec::with_capacity(count as usize);
    sequence.extend(std::iter::repeat(Personality::Critical).take(per as usize));
    sequence.extend(std::iter::repeat(Personality::Balanced).take((per + remainder) as usize));
    sequence.extend(std::iter::repeat(Personality::Lenient).take(per as usize));
    rng.shuffle(&mut sequence);
    sequence
}

/// Quality-derived base score plus personality bias, clamped to [1,5].
/// The sub-unit jitter keeps genuine ratings from collapsing onto a
/// single value per product.
fn genuine_rating(product: &ProductSpec, personality: Personality, rng: &mut SubsystemRng) -> u8 {
    let base = product.avg_quality() / 2.0 + (rng.next_f64() - 0.5);
    let rating = base.round() as i64 + personality.bias();
    rating.clamp(1, 5) as u8
}

pub struct ReviewerPopulation {
    run_id: RunId,
    schedule: CampaignSchedule,
}

impl ReviewerPopulation {
    pub fn new(run_id: RunId, schedule: CampaignSchedule) -> Self {
        Self { run_id, schedule }
    }

    fn post_review(
        &self,
        ctx: &mut PhaseContext<'_>,
        product: &ProductSpec,
        author: AuthorKind,
        rating: u8,
        iteration: Iteration,
    ) -> SimResult<()> {
        let (kind, personality) = match author {
            AuthorKind::Genuine(p) => (PromptKind::GenuineReview, Some(p)),
            AuthorKind::Fake => (PromptKind::FakeReview, None),
        };
        let gen_ctx = GenContext {
            product,
            personality,
            persona: None,
            decision: None,
            fake_fraction: None,
        };
        let text = generate_with_retry(
            ctx.textgen,
            kind,
            &gen_ctx,
            ctx.config.generation.review_temperature,
            ctx.config.generation.max_retries,
        )?;

        let record = ReviewRecord {
            review_id: Uuid::new_v4().to_string(),
            product_id: product.id,
            author,
            rating,
            text,
            is_fake: matches!(author, AuthorKind::Fake),
            iteration,
        };
        ctx.store.insert_review(&self.run_id, &record)?;
        ctx.market.apply_review(product.id, rating, record.is_fake);
        Ok(())
    }

    fn genuine_phase(
        &self,
        iteration: Iteration,
        ctx: &mut PhaseContext<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let count = ctx.config.genuine_reviews_per_product;
        if count == 0 {
            log::warn!("iteration {iteration}: zero genuine reviewers configured");
            events.push(SimEvent::EmptyPopulationObserved {
                iteration,
                population: "genuine_reviewers".into(),
            });
            return Ok(events);
        }

        let catalog: Vec<ProductSpec> = ctx.catalog.to_vec();
        for product in &catalog {
            let sequence = personality_sequence(count, rng);
            for personality in sequence {
                let rating = genuine_rating(product, personality, rng);
                self.post_review(ctx, product, AuthorKind::Genuine(personality), rating, iteration)?;
            }
            events.push(SimEvent::GenuineReviewsPosted {
                iteration,
                product_id: product.id,
                count,
            });
        }
        Ok(events)
    }

    fn fake_phase(
        &self,
        iteration: Iteration,
        ctx: &mut PhaseContext<'_>,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let phase = self.schedule.phase(iteration);
        for &target in self.schedule.targets() {
            let volume = self.schedule.fake_volume(iteration, target);
            if volume == 0 {
                continue;
            }
            let product = ctx
                .catalog
                .iter()
                .find(|p| p.id == target)
                .cloned()
                .ok_or(SimError::UnknownProduct(target))?;
            for _ in 0..volume {
                // Fake reviews always carry the maximum rating.
                self.post_review(ctx, &product, AuthorKind::Fake, 5, iteration)?;
            }
            let rating_after = ctx.market.current_rating(target).unwrap_or(0.0);
            log::info!(
                "iteration {iteration}: injected {volume} fakes against product {target} \
                 ({} now {rating_after:.2} stars)",
                product.name
            );
            events.push(SimEvent::FakeReviewsInjected {
                iteration,
                product_id: target,
                count: volume,
                phase,
                rating_after,
            });
        }
        Ok(events)
    }
}

impl SimSubsystem for ReviewerPopulation {
    fn name(&self) -> &'static str {
        "reviewer"
    }

    fn update(
        &mut self,
        iteration: Iteration,
        ctx: &mut PhaseContext<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = self.genuine_phase(iteration, ctx, rng)?;
        events.extend(self.fake_phase(iteration, ctx)?);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::rng::{RngBank, SubsystemSlot};

    #[test]
    fn personality_split_is_even_with_remainder_to_balanced() {
        let mut rng = RngBank::new(1).for_subsystem(SubsystemSlot::Reviewer);
        for count in [6u32, 7, 8, 12] {
            let seq = personality_sequence(count, &mut rng);
            let critical = seq.iter().filter(|p| **p == Personality::Critical).count();
            let balanced = seq.iter().filter(|p| **p == Personality::Balanced).count();
            let lenient = seq.iter().filter(|p| **p == Personality::Lenient).count();
            assert_eq!(critical as u32, count / 3);
            assert_eq!(lenient as u32, count / 3);
            assert_eq!(balanced as u32, count / 3 + count % 3);
        }
    }

    #[test]
    fn genuine_ratings_stay_in_range_and_track_quality() {
        let catalog = default_catalog();
        let mut rng = RngBank::new(42).for_subsystem(SubsystemSlot::Reviewer);
        let premium = catalog.iter().find(|p| p.id == 4).unwrap();
        let low = catalog.iter().find(|p| p.id == 3).unwrap();

        let mut premium_sum = 0u32;
        let mut low_sum = 0u32;
        for _ in 0..200 {
            for personality in [
                Personality::Critical,
                Personality::Balanced,
                Personality::Lenient,
            ] {
                let rp = genuine_rating(premium, personality, &mut rng);
                let rl = genuine_rating(low, personality, &mut rng);
                assert!((1..=5).contains(&rp));
                assert!((1..=5).contains(&rl));
                premium_sum += u32::from(rp);
                low_sum += u32::from(rl);
            }
        }
        assert!(
            premium_sum > low_sum,
            "premium product must average higher genuine ratings"
        );
    }
}
