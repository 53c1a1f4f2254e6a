//! Post-run analysis engine.
//!
//! Reads the committed transaction records and quantifies the campaign
//! effect three ways:
//!   - conversion-rate tables by product, persona, and campaign phase;
//!   - a Pearson chi-square test (baseline vs. burst buys) with
//!     Cramer's V as the effect size;
//!   - a one-way ANOVA across personas on burst-phase buy indicators.
//!
//! The pure statistics are free functions so they are testable against
//! textbook fixtures without a database. Degenerate inputs (an empty
//! phase, a zero expected cell, too few groups) are reported as
//! errors, never as a fabricated p-value.

use crate::{
    campaign::{CampaignPhase, CampaignSchedule},
    config::SimConfig,
    distributions::{chi_square_p_value, f_p_value},
    error::{SimError, SimResult},
    shopper::{Persona, TransactionRecord, PERSONAS},
    store::SimStore,
    types::{Iteration, ProductId, RunId},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct ConversionCell {
    pub buys: u32,
    pub total: u32,
}

impl ConversionCell {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.buys) / f64::from(self.total)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChiSquareResult {
    pub chi2: f64,
    pub df: u32,
    pub p_value: f64,
    pub cramers_v: f64,
    /// Observed counts: rows = [baseline, burst], cols = [buy, no-buy].
    pub observed: [[u64; 2]; 2],
}

#[derive(Debug, Clone)]
pub struct AnovaResult {
    pub f_statistic: f64,
    pub df_between: u32,
    pub df_within: u32,
    pub p_value: f64,
    pub group_means: Vec<(Persona, f64)>,
}

// ── Pure statistics ────────────────────────────────────────────────

/// Pearson chi-square over an r x c contingency table, no continuity
/// correction. Errors on zero marginals (an expected cell would be 0).
pub fn pearson_chi_square(observed: &[Vec<u64>]) -> SimResult<(f64, u32)> {
    let rows = observed.len();
    let cols = observed.first().map_or(0, Vec::len);
    if rows < 2 || cols < 2 {
        return Err(SimError::degenerate("contingency table needs 2x2 or larger"));
    }
    let row_sums: Vec<u64> = observed.iter().map(|r| r.iter().sum()).collect();
    let col_sums: Vec<u64> = (0..cols)
        .map(|c| observed.iter().map(|r| r[c]).sum())
        .collect();
    let n: u64 = row_sums.iter().sum();
    if n == 0 || row_sums.iter().any(|&s| s == 0) || col_sums.iter().any(|&s| s == 0) {
        return Err(SimError::degenerate(
            "zero marginal: a row or column of the table is empty",
        ));
    }
    let mut chi2 = 0.0;
    for (r, row) in observed.iter().enumerate() {
        for (c, &obs) in row.iter().enumerate() {
            let expected = (row_sums[r] as f64) * (col_sums[c] as f64) / n as f64;
            let diff = obs as f64 - expected;
            chi2 += diff * diff / expected;
        }
    }
    let df = (rows as u32 - 1) * (cols as u32 - 1);
    Ok((chi2, df))
}

/// Cramer's V effect size, clamped to [0, 1] against float round-off.
pub fn cramers_v(chi2: f64, n: u64, rows: usize, cols: usize) -> f64 {
    let min_dim = rows.min(cols).saturating_sub(1).max(1);
    (chi2 / (n as f64 * min_dim as f64)).sqrt().clamp(0.0, 1.0)
}

/// One-way ANOVA over `groups` of observations.
///
/// Needs at least two groups with at least two observations each.
/// Identical group means short-circuit to F = 0, p = 1. Zero
/// within-group variance with unequal means leaves the F-statistic
/// undefined and is reported as a degenerate input.
pub fn one_way_anova(groups: &[Vec<f64>]) -> SimResult<(f64, u32, u32, f64)> {
    if groups.len() < 2 {
        return Err(SimError::degenerate("ANOVA needs at least two groups"));
    }
    if groups.iter().any(|g| g.len() < 2) {
        return Err(SimError::degenerate(
            "ANOVA needs at least two observations per group",
        ));
    }
    let n: usize = groups.iter().map(Vec::len).sum();
    let grand_mean: f64 = groups.iter().flatten().sum::<f64>() / n as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let mean: f64 = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    }

    let df_between = (groups.len() - 1) as u32;
    let df_within = (n - groups.len()) as u32;
    if ss_between < 1e-12 {
        return Ok((0.0, df_between, df_within, 1.0));
    }
    if ss_within < 1e-12 {
        return Err(SimError::degenerate(
            "zero within-group variance with unequal means",
        ));
    }
    let f = (ss_between / f64::from(df_between)) / (ss_within / f64::from(df_within));
    let p = f_p_value(f, df_between, df_within);
    Ok((f, df_between, df_within, p))
}

// ── Run-level engine ───────────────────────────────────────────────

pub struct AnalysisEngine {
    schedule: CampaignSchedule,
    total_iterations: Iteration,
    txns: Vec<TransactionRecord>,
}

impl AnalysisEngine {
    /// Load the run's transactions once; every report below is a pass
    /// over that in-memory slice.
    pub fn new(store: &SimStore, run_id: &RunId, config: &SimConfig) -> SimResult<Self> {
        Ok(Self {
            schedule: CampaignSchedule::from_config(config),
            total_iterations: config.total_iterations,
            txns: store.txns_for_run(run_id)?,
        })
    }

    pub fn phase_of(&self, iteration: Iteration) -> CampaignPhase {
        self.schedule.phase(iteration)
    }

    fn cell<F>(&self, predicate: F) -> ConversionCell
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        let mut cell = ConversionCell { buys: 0, total: 0 };
        for txn in self.txns.iter().filter(|t| predicate(t)) {
            cell.total += 1;
            if txn.decision.is_buy() {
                cell.buys += 1;
            }
        }
        cell
    }

    /// Conversion rate per product per campaign phase.
    pub fn conversion_by_product_phase(
        &self,
    ) -> BTreeMap<ProductId, BTreeMap<&'static str, ConversionCell>> {
        let mut report: BTreeMap<ProductId, BTreeMap<&'static str, ConversionCell>> =
            BTreeMap::new();
        for phase in [
            CampaignPhase::Baseline,
            CampaignPhase::Burst,
            CampaignPhase::Maintenance,
        ] {
            let products: Vec<ProductId> = {
                let mut ids: Vec<ProductId> = self.txns.iter().map(|t| t.product_id).collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            };
            for product_id in products {
                let cell = self.cell(|t| {
                    t.product_id == product_id && self.phase_of(t.iteration) == phase
                });
                if cell.total > 0 {
                    report.entry(product_id).or_default().insert(phase.name(), cell);
                }
            }
        }
        report
    }

    /// Conversion rate per persona per campaign phase, for one product.
    pub fn conversion_by_persona_phase(
        &self,
        product_id: ProductId,
    ) -> BTreeMap<&'static str, BTreeMap<&'static str, ConversionCell>> {
        let mut report: BTreeMap<&'static str, BTreeMap<&'static str, ConversionCell>> =
            BTreeMap::new();
        for persona in PERSONAS {
            for phase in [
                CampaignPhase::Baseline,
                CampaignPhase::Burst,
                CampaignPhase::Maintenance,
            ] {
                let cell = self.cell(|t| {
                    t.product_id == product_id
                        && t.persona == persona
                        && self.phase_of(t.iteration) == phase
                });
                if cell.total > 0 {
                    report
                        .entry(persona.name())
                        .or_default()
                        .insert(phase.name(), cell);
                }
            }
        }
        report
    }

    /// Chi-square test of independence between campaign phase
    /// (baseline vs. burst) and purchase decision, for one product.
    pub fn chi_square_conversion(&self, product_id: ProductId) -> SimResult<ChiSquareResult> {
        let baseline = self.cell(|t| {
            t.product_id == product_id && self.phase_of(t.iteration) == CampaignPhase::Baseline
        });
        let burst = self.cell(|t| {
            t.product_id == product_id && self.phase_of(t.iteration) == CampaignPhase::Burst
        });
        if baseline.total == 0 || burst.total == 0 {
            return Err(SimError::degenerate(format!(
                "product {product_id}: a phase has no recorded decisions"
            )));
        }

        let observed = [
            [u64::from(baseline.buys), u64::from(baseline.total - baseline.buys)],
            [u64::from(burst.buys), u64::from(burst.total - burst.buys)],
        ];
        let table: Vec<Vec<u64>> = observed.iter().map(|r| r.to_vec()).collect();
        let (chi2, df) = pearson_chi_square(&table)?;
        let n = u64::from(baseline.total) + u64::from(burst.total);
        Ok(ChiSquareResult {
            chi2,
            df,
            p_value: chi_square_p_value(chi2, df),
            cramers_v: cramers_v(chi2, n, 2, 2),
            observed,
        })
    }

    /// One-way ANOVA across personas on burst-phase buy indicators
    /// (1.0 = buy, 0.0 = no-buy) for one product. Quantifies whether
    /// persona membership explains decision variance under attack.
    pub fn anova_personas(&self, product_id: ProductId) -> SimResult<AnovaResult> {
        let mut groups: Vec<Vec<f64>> = Vec::with_capacity(PERSONAS.len());
        let mut group_means = Vec::with_capacity(PERSONAS.len());
        for persona in PERSONAS {
            let indicators: Vec<f64> = self
                .txns
                .iter()
                .filter(|t| {
                    t.product_id == product_id
                        && t.persona == persona
                        && self.phase_of(t.iteration) == CampaignPhase::Burst
                })
                .map(|t| if t.decision.is_buy() { 1.0 } else { 0.0 })
                .collect();
            if !indicators.is_empty() {
                let mean = indicators.iter().sum::<f64>() / indicators.len() as f64;
                group_means.push((persona, mean));
                groups.push(indicators);
            }
        }
        let (f_statistic, df_between, df_within, p_value) = one_way_anova(&groups)?;
        Ok(AnovaResult {
            f_statistic,
            df_between,
            df_within,
            p_value,
            group_means,
        })
    }

    /// Iterations belonging to one phase, in order. Exposed for report
    /// rendering.
    pub fn phase_iterations(&self, phase: CampaignPhase) -> Vec<Iteration> {
        (1..=self.total_iterations)
            .filter(|&i| self.phase_of(i) == phase)
            .collect()
    }
}
