//! Event-log shape and review-sampling behavior observable through
//! the persisted records.

use astroturf_core::{
    config::{SamplingStrategy, SimConfig},
    engine::SimEngine,
    shopper::Persona,
    store::SimStore,
};

fn run(seed: u64, config: SimConfig) -> SimEngine {
    let store = SimStore::in_memory().expect("store");
    let mut engine =
        SimEngine::build(format!("log-test-{seed}"), seed, store, config).expect("build");
    engine.run().expect("run");
    engine
}

#[test]
fn each_iteration_is_bracketed_by_start_and_completion() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 4;
    config.burst_iterations.retain(|&i| i <= 4);
    config.burst_volume_per_target.retain(|&i, _| i <= 4);
    let engine = run(31, config);

    for iteration in 1..=4 {
        let events = engine
            .store_events_for_iteration(&engine.run_id, iteration)
            .unwrap();
        let first = events.first().expect("no events");
        let last = events.last().expect("no events");
        assert_eq!(first.event_type, "iteration_started");
        assert_eq!(last.event_type, "iteration_completed");
        // Phase 1 events all precede Phase 2 events.
        let first_shopper = events.iter().position(|e| e.subsystem == "shopper");
        let last_reviewer = events.iter().rposition(|e| e.subsystem == "reviewer");
        if let (Some(s), Some(r)) = (first_shopper, last_reviewer) {
            assert!(r < s, "reviewer event after shopper event in iteration {iteration}");
        }
    }
}

#[test]
fn completion_counters_match_the_configuration() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 4;
    config.burst_iterations.retain(|&i| i <= 4);
    config.burst_volume_per_target.retain(|&i, _| i <= 4);
    let engine = run(32, config);

    // Iteration 4 is a burst: 6 genuine x 5 products + 50 fakes x 2
    // targets; decisions are 5 products x 3 personas x 4 shoppers.
    let events = engine.store_events_for_iteration(&engine.run_id, 4).unwrap();
    let completed = events.last().unwrap();
    let payload: serde_json::Value = serde_json::from_str(&completed.payload).unwrap();
    assert_eq!(payload["reviews_posted"], 30 + 100);
    assert_eq!(payload["decisions_recorded"], 60);
}

#[test]
fn shoppers_read_the_whole_pool_when_it_falls_short() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 1;
    config.burst_iterations.clear();
    config.burst_volume_per_target.clear();
    config.maintenance_volume_per_target = 0;
    config.genuine_reviews_per_product = 6;
    let engine = run(33, config);

    // After one iteration a non-target pool holds 6 reviews, below the
    // skeptical read count of 15.
    let txns = engine.store().txns_for_run(&engine.run_id).unwrap();
    let skeptical_on_untargeted: Vec<_> = txns
        .iter()
        .filter(|t| t.product_id == 1 && t.persona == Persona::Skeptical)
        .collect();
    assert!(!skeptical_on_untargeted.is_empty());
    for txn in skeptical_on_untargeted {
        assert_eq!(txn.reviews_read, 6);
    }
}

#[test]
fn fake_exposure_is_recorded_on_each_transaction() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 4;
    config.burst_iterations.retain(|&i| i <= 4);
    config.burst_volume_per_target.retain(|&i, _| i <= 4);
    let engine = run(34, config);

    let txns = engine.store().txns_for_run(&engine.run_id).unwrap();
    // Burst iteration, target product: impulsive samples (3 most
    // recent) are saturated with fakes.
    let exposed: Vec<_> = txns
        .iter()
        .filter(|t| t.iteration == 4 && t.product_id == 3 && t.persona == Persona::Impulsive)
        .collect();
    assert!(!exposed.is_empty());
    for txn in exposed {
        assert_eq!(txn.fake_in_sample, txn.reviews_read);
        assert!((txn.fake_fraction - 1.0).abs() < f64::EPSILON);
        assert!(!txn.rationale.is_empty());
    }

    // Untargeted products never show fake exposure.
    assert!(txns
        .iter()
        .filter(|t| t.product_id == 2)
        .all(|t| t.fake_in_sample == 0));
}

#[test]
fn alternative_sampling_strategies_run_clean() {
    for strategy in [SamplingStrategy::Random, SamplingStrategy::FullPool] {
        let mut config = SimConfig::default_test();
        config.total_iterations = 3;
        config.burst_iterations.clear();
        config.burst_volume_per_target.clear();
        config.maintenance_volume_per_target = 0;
        config.sampling = strategy;
        let engine = run(35, config);
        assert_eq!(engine.store().txn_count(&engine.run_id).unwrap(), 3 * 5 * 3 * 4);
    }
}

#[test]
fn full_pool_sampling_reads_everything_posted_so_far() {
    let mut config = SimConfig::default_test();
    config.total_iterations = 2;
    config.burst_iterations.clear();
    config.burst_volume_per_target.clear();
    config.maintenance_volume_per_target = 0;
    config.sampling = SamplingStrategy::FullPool;
    let engine = run(36, config);

    let txns = engine.store().txns_for_run(&engine.run_id).unwrap();
    for txn in txns.iter().filter(|t| t.product_id == 1) {
        // 6 genuine per iteration, cumulative.
        let expected = 6 * txn.iteration as u32;
        assert_eq!(txn.reviews_read, expected);
    }
}
