//! Persona susceptibility under a burst campaign.
//!
//! The target is a low-quality product whose genuine ratings hover
//! near 2 stars. A burst floods it with five-star fakes, so the
//! most-recent samples every persona reads flip to a perfect average:
//!   - impulsive shoppers convert on rating alone;
//!   - careful shoppers convert because rating dominates their score;
//!   - skeptical shoppers spot the same-iteration cluster of generic
//!     five-star texts and mostly hold out.

use astroturf_core::{
    config::SimConfig, engine::SimEngine, stats::AnalysisEngine, store::SimStore,
};

fn run_campaign(seed: u64) -> SimEngine {
    let mut config = SimConfig::default_test();
    config.total_iterations = 12;
    config.campaign_targets = vec![3];
    let store = SimStore::in_memory().expect("store");
    let mut engine =
        SimEngine::build(format!("persona-test-{seed}"), seed, store, config).expect("build");
    engine.run().expect("run");
    engine
}

fn rate(
    report: &std::collections::BTreeMap<
        &'static str,
        std::collections::BTreeMap<&'static str, astroturf_core::stats::ConversionCell>,
    >,
    persona: &str,
    phase: &str,
) -> f64 {
    report
        .get(persona)
        .and_then(|phases| phases.get(phase))
        .map(|cell| cell.rate())
        .unwrap_or_else(|| panic!("missing cell {persona}/{phase}"))
}

#[test]
fn burst_lifts_impulsive_conversion_from_near_zero() {
    let engine = run_campaign(101);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();
    let report = analysis.conversion_by_persona_phase(3);

    let baseline = rate(&report, "impulsive", "baseline");
    let burst = rate(&report, "impulsive", "burst");
    assert!(baseline < 0.5, "baseline conversion too high: {baseline}");
    assert!(
        (burst - 1.0).abs() < f64::EPSILON,
        "a perfect sampled average must convert every impulsive shopper, got {burst}"
    );
}

#[test]
fn careful_shoppers_are_deceived_by_the_inflated_average() {
    let engine = run_campaign(102);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();
    let report = analysis.conversion_by_persona_phase(3);

    let baseline = rate(&report, "careful", "baseline");
    let burst = rate(&report, "careful", "burst");
    assert!(burst > baseline, "burst must lift careful conversion");
    assert!(burst > 0.9, "careful shoppers should mostly buy under burst: {burst}");
}

#[test]
fn skeptics_resist_the_burst_that_converts_everyone_else() {
    let engine = run_campaign(103);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();
    let report = analysis.conversion_by_persona_phase(3);

    let skeptical_burst = rate(&report, "skeptical", "burst");
    let careful_burst = rate(&report, "careful", "burst");
    let impulsive_burst = rate(&report, "impulsive", "burst");

    assert!(
        skeptical_burst < careful_burst && skeptical_burst < impulsive_burst,
        "skeptics must convert least under burst: {skeptical_burst} vs {careful_burst}/{impulsive_burst}"
    );
    assert!(skeptical_burst < 0.5, "suspicion dampening too weak: {skeptical_burst}");
}

#[test]
fn maintenance_keeps_impulsive_conversion_elevated() {
    let engine = run_campaign(104);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();
    let report = analysis.conversion_by_persona_phase(3);

    // Maintenance fakes post last each iteration, so an impulsive
    // shopper's tiny most-recent sample stays saturated with them.
    let baseline = rate(&report, "impulsive", "baseline");
    let maintenance = rate(&report, "impulsive", "maintenance");
    assert!(
        maintenance > baseline,
        "maintenance must outconvert baseline: {maintenance} vs {baseline}"
    );
}

#[test]
fn single_product_campaign_timeline_reproduces_the_reference_curve() {
    // One low-quality product under attack: 3 clean iterations, bursts
    // of 20 fakes at iterations 4 and 5, then 15 maintenance
    // iterations of 5 fakes each. Impulsive shoppers read the 3 most
    // recent reviews and buy on an average of 4+ stars.
    let mut config = SimConfig::default_test();
    let budget = config
        .catalog
        .iter()
        .find(|p| p.id == 3)
        .expect("catalog product")
        .clone();
    config.catalog = vec![budget];
    config.campaign_targets = vec![3];
    config.total_iterations = 20;
    config.burst_iterations = vec![4, 5];
    config.burst_volume_per_target = [(4, 20), (5, 20)].into();
    config.maintenance_volume_per_target = 5;
    config.shoppers_per_persona_per_product = 20;

    let store = SimStore::in_memory().expect("store");
    let mut engine =
        SimEngine::build("timeline-test".to_string(), 106, store, config).expect("build");
    engine.run().expect("run");

    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();
    let report = analysis.conversion_by_persona_phase(3);
    let baseline = rate(&report, "impulsive", "baseline");
    let burst = rate(&report, "impulsive", "burst");
    let maintenance = rate(&report, "impulsive", "maintenance");

    assert!(baseline < 0.2, "baseline must stay near zero: {baseline}");
    assert!(burst > 0.9, "burst must convert nearly everyone: {burst}");
    assert!(
        maintenance > baseline && maintenance <= burst,
        "maintenance must stay elevated: {maintenance} (baseline {baseline}, burst {burst})"
    );
}

#[test]
fn untargeted_products_see_no_burst_effect_from_the_campaign() {
    let engine = run_campaign(105);
    let analysis = AnalysisEngine::new(engine.store(), &engine.run_id, engine.config()).unwrap();

    // Product 4 never receives fakes; its review pool is genuine in
    // every phase, so the campaign cannot move its sampled averages.
    let reviews = engine.store().all_reviews(&engine.run_id, 4).unwrap();
    assert!(reviews.iter().all(|r| !r.is_fake));

    let report = analysis.conversion_by_persona_phase(4);
    let baseline = rate(&report, "skeptical", "baseline");
    let burst = rate(&report, "skeptical", "burst");
    // Same decision policy, same genuine pool: any gap is noise, not a
    // campaign signature.
    assert!((baseline - burst).abs() < 0.6);
}
