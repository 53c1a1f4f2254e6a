//! Market state — the per-product aggregate rating.
//!
//! RULE: the aggregate is always derived from the reviews applied so
//! far, `R = (Σ r_i) / n`. No weighting, no decay, no stored rating
//! that could drift from the review history. The engine owns the one
//! `MarketState` for the run and passes it to populations explicitly;
//! nothing reads it as ambient global state.

use crate::types::ProductId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct RatingAggregate {
    sum: u64,
    count: u64,
    fake_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MarketState {
    aggregates: HashMap<ProductId, RatingAggregate>,
}

impl MarketState {
    pub fn new(product_ids: impl IntoIterator<Item = ProductId>) -> Self {
        let aggregates = product_ids
            .into_iter()
            .map(|id| (id, RatingAggregate::default()))
            .collect();
        Self { aggregates }
    }

    /// Fold one review into the running mean. Ratings are validated at
    /// review creation; this only accumulates.
    pub fn apply_review(&mut self, product_id: ProductId, rating: u8, is_fake: bool) {
        let agg = self.aggregates.entry(product_id).or_default();
        agg.sum += u64::from(rating);
        agg.count += 1;
        if is_fake {
            agg.fake_count += 1;
        }
    }

    /// The up-to-date mean rating, or `None` before any review exists.
    /// Returning an explicit no-data result (rather than 0.0) keeps
    /// early-iteration decisions unbiased.
    pub fn current_rating(&self, product_id: ProductId) -> Option<f64> {
        let agg = self.aggregates.get(&product_id)?;
        if agg.count == 0 {
            return None;
        }
        Some(agg.sum as f64 / agg.count as f64)
    }

    pub fn review_count(&self, product_id: ProductId) -> u64 {
        self.aggregates.get(&product_id).map_or(0, |a| a.count)
    }

    pub fn fake_count(&self, product_id: ProductId) -> u64 {
        self.aggregates.get(&product_id).map_or(0, |a| a.fake_count)
    }
}
