//! The product catalog — fixed quality attributes for every product
//! in the marketplace. Created once at setup, never mutated.

use crate::types::ProductId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Premium,
    High,
    MediumHigh,
    LowMedium,
    Low,
}

/// Fixed product attributes. Sub-scores are on a 0-10 scale; the
/// aggregate star rating lives in `MarketState`, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSpec {
    pub id: ProductId,
    pub name: String,
    /// Listed price in Rupiah.
    pub price: u32,
    pub tier: QualityTier,
    pub sound_quality: f64,
    pub build_quality: f64,
    pub battery_life: f64,
    pub comfort: f64,
}

impl ProductSpec {
    /// Mean of the four quality sub-scores, 0-10 scale.
    pub fn avg_quality(&self) -> f64 {
        (self.sound_quality + self.build_quality + self.battery_life + self.comfort) / 4.0
    }

    /// Quality delivered per 100k Rupiah. Used by price-sensitive
    /// shopper policies.
    pub fn quality_per_price(&self) -> f64 {
        self.avg_quality() / (f64::from(self.price) / 100_000.0)
    }
}

/// The five headphone products of the reference marketplace.
/// Products 3 and 5 are the default fake-campaign targets.
pub fn default_catalog() -> Vec<ProductSpec> {
    vec![
        ProductSpec {
            id: 1,
            name: "SoundMax Pro".into(),
            price: 450_000,
            tier: QualityTier::High,
            sound_quality: 8.5,
            build_quality: 8.0,
            battery_life: 9.0,
            comfort: 8.5,
        },
        ProductSpec {
            id: 2,
            name: "AudioBlast Wireless".into(),
            price: 350_000,
            tier: QualityTier::MediumHigh,
            sound_quality: 7.5,
            build_quality: 7.0,
            battery_life: 8.0,
            comfort: 7.5,
        },
        ProductSpec {
            id: 3,
            name: "BudgetBeats".into(),
            price: 150_000,
            tier: QualityTier::Low,
            sound_quality: 4.0,
            build_quality: 3.5,
            battery_life: 5.5,
            comfort: 4.5,
        },
        ProductSpec {
            id: 4,
            name: "TechWave Elite".into(),
            price: 650_000,
            tier: QualityTier::Premium,
            sound_quality: 9.5,
            build_quality: 9.0,
            battery_life: 9.5,
            comfort: 9.0,
        },
        ProductSpec {
            id: 5,
            name: "ClearSound Basic".into(),
            price: 250_000,
            tier: QualityTier::LowMedium,
            sound_quality: 5.0,
            build_quality: 4.5,
            battery_life: 6.0,
            comfort: 5.5,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_quality_is_mean_of_subscores() {
        let catalog = default_catalog();
        let budget = catalog.iter().find(|p| p.id == 3).unwrap();
        assert!((budget.avg_quality() - 4.375).abs() < 1e-12);
    }

    #[test]
    fn cheap_low_tier_product_still_has_value_for_money() {
        // BudgetBeats is low quality but cheap; its quality-per-price
        // exceeds the premium product's. This asymmetry is what keeps
        // price-sensitive personas from refusing every low-tier product.
        let catalog = default_catalog();
        let budget = catalog.iter().find(|p| p.id == 3).unwrap();
        let elite = catalog.iter().find(|p| p.id == 4).unwrap();
        assert!(budget.quality_per_price() > elite.quality_per_price());
    }
}
