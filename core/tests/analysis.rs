//! End-to-end statistical detection of the campaign effect.

use astroturf_core::{
    config::SimConfig, engine::SimEngine, error::SimError, stats::AnalysisEngine, store::SimStore,
};

fn run(seed: u64, config: SimConfig) -> SimEngine {
    let store = SimStore::in_memory().expect("store");
    let mut engine =
        SimEngine::build(format!("analysis-test-{seed}"), seed, store, config).expect("build");
    engine.run().expect("run");
    engine
}

#[test]
fn chi_square_flags_the_target_product() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 10;
    let engine = run(201, config);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    let result = analysis.chi_square_conversion(3).unwrap();
    assert_eq!(result.df, 1);
    let baseline_rate =
        result.observed[0][0] as f64 / (result.observed[0][0] + result.observed[0][1]) as f64;
    let burst_rate =
        result.observed[1][0] as f64 / (result.observed[1][0] + result.observed[1][1]) as f64;
    assert!(
        burst_rate > baseline_rate,
        "burst must outconvert baseline: {burst_rate} vs {baseline_rate}"
    );
    assert!(result.p_value < 0.01, "p = {}", result.p_value);
    assert!(result.cramers_v > 0.3, "V = {}", result.cramers_v);
}

#[test]
fn effect_size_concentrates_on_targets() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 10;
    let engine = run(202, config);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    let target = analysis.chi_square_conversion(3).unwrap();
    let untargeted = analysis.chi_square_conversion(1).unwrap();
    assert!(
        target.cramers_v > untargeted.cramers_v,
        "target effect {} must exceed untargeted {}",
        target.cramers_v,
        untargeted.cramers_v
    );
}

#[test]
fn anova_separates_personas_under_burst() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 10;
    config.shoppers_per_persona_per_product = 6;
    let engine = run(203, config);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    // Persona membership must explain the burst-phase decisions: either
    // the F-test is significant, or the groups are so cleanly split
    // (all-buy vs. all-no-buy) that the statistic is degenerate.
    match analysis.anova_personas(3) {
        Ok(result) => {
            assert_eq!(result.df_between, 2);
            assert!(result.p_value < 0.05, "p = {}", result.p_value);
        }
        Err(SimError::Degenerate { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }

    let report = analysis.conversion_by_persona_phase(3);
    let burst_rate = |persona: &str| {
        report
            .get(persona)
            .and_then(|phases| phases.get("burst"))
            .map(|cell| cell.rate())
            .expect("missing burst cell")
    };
    assert!(burst_rate("skeptical") < burst_rate("impulsive"));
    assert!(burst_rate("skeptical") < burst_rate("careful"));
}

#[test]
fn chi_square_is_degenerate_without_a_burst_phase() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 3; // run stops before the first burst
    config.burst_iterations = vec![];
    config.burst_volume_per_target.clear();
    config.maintenance_volume_per_target = 0;
    let engine = run(204, config);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    assert!(matches!(
        analysis.chi_square_conversion(3),
        Err(SimError::Degenerate { .. })
    ));
}

#[test]
fn conversion_report_covers_every_product_and_phase_with_data() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 8;
    let engine = run(205, config);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    let report = analysis.conversion_by_product_phase();
    assert_eq!(report.len(), 5);
    for (product_id, phases) in &report {
        for phase in ["baseline", "burst", "maintenance"] {
            let cell = phases
                .get(phase)
                .unwrap_or_else(|| panic!("product {product_id} missing {phase}"));
            // 3 personas x 4 shoppers per iteration in that phase.
            assert_eq!(cell.total % 12, 0);
            assert!(cell.buys <= cell.total);
        }
    }
}

#[test]
fn phase_partition_covers_the_whole_run() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 9;
    let engine = run(206, config);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    let mut covered: Vec<u64> = Vec::new();
    for phase in [
        astroturf_core::campaign::CampaignPhase::Baseline,
        astroturf_core::campaign::CampaignPhase::Burst,
        astroturf_core::campaign::CampaignPhase::Maintenance,
    ] {
        covered.extend(analysis.phase_iterations(phase));
    }
    covered.sort_unstable();
    assert_eq!(covered, (1..=9).collect::<Vec<_>>());
}
