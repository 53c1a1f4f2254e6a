//! sim-runner: headless runner for the astroturf marketplace study.
//!
//! Usage:
//!   sim-runner --seed 12345 --db run.db
//!   sim-runner --seed 12345 --config scenario.json --iterations 20
//!   sim-runner --write-config scenario.json

use anyhow::Result;
use astroturf_core::{
    config::SimConfig,
    engine::SimEngine,
    stats::AnalysisEngine,
    store::SimStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");

    if let Some(path) = str_arg(&args, "--write-config") {
        let json = serde_json::to_string_pretty(&SimConfig::default_test())?;
        std::fs::write(path, json)?;
        println!("wrote reference scenario to {path}");
        return Ok(());
    }

    let mut config = match str_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default_test(),
    };
    if let Some(n) = args
        .windows(2)
        .find(|w| w[0] == "--iterations")
        .and_then(|w| w[1].parse().ok())
    {
        config.total_iterations = n;
        config.validate()?;
    }

    println!("astroturf study — sim-runner");
    println!("  seed:       {seed}");
    println!("  iterations: {}", config.total_iterations);
    println!("  targets:    {:?}", config.campaign_targets);
    println!("  db:         {db}");
    println!();

    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    let run_id = format!("run-{seed}-{}", epoch_secs());
    let mut engine = SimEngine::build(run_id.clone(), seed, store, config)?;
    engine.run()?;
    log::info!("run {run_id} complete");

    print_report(&engine, &run_id)?;
    Ok(())
}

fn print_report(engine: &SimEngine, run_id: &str) -> Result<()> {
    let analysis = AnalysisEngine::new(engine.store(), &run_id.to_string(), engine.config())?;

    println!("=== CONVERSION BY PRODUCT AND PHASE ===");
    for (product_id, phases) in analysis.conversion_by_product_phase() {
        let name = engine
            .config()
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        let tag = if engine.config().campaign_targets.contains(&product_id) {
            " [TARGET]"
        } else {
            ""
        };
        println!("  product {product_id} ({name}){tag}");
        for phase in ["baseline", "burst", "maintenance"] {
            if let Some(cell) = phases.get(phase) {
                println!(
                    "    {phase:<12} {:>4}/{:<4} = {:.1}%",
                    cell.buys,
                    cell.total,
                    cell.rate() * 100.0
                );
            }
        }
    }

    for &target in &engine.config().campaign_targets {
        println!();
        println!("=== TARGET {target}: PERSONA BREAKDOWN ===");
        for (persona, phases) in analysis.conversion_by_persona_phase(target) {
            print!("  {persona:<10}");
            for phase in ["baseline", "burst", "maintenance"] {
                match phases.get(phase) {
                    Some(cell) => print!(" {phase}: {:.1}%", cell.rate() * 100.0),
                    None => print!(" {phase}: -"),
                }
            }
            println!();
        }

        match analysis.chi_square_conversion(target) {
            Ok(result) => {
                println!(
                    "  chi-square (baseline vs burst): chi2 = {:.3}, df = {}, p = {:.2e}, V = {:.3}",
                    result.chi2, result.df, result.p_value, result.cramers_v
                );
            }
            Err(e) => println!("  chi-square: not computable ({e})"),
        }
        match analysis.anova_personas(target) {
            Ok(result) => {
                println!(
                    "  ANOVA across personas (burst): F = {:.3}, p = {:.2e}",
                    result.f_statistic, result.p_value
                );
                for (persona, mean) in &result.group_means {
                    println!("    {:<10} mean buy rate {:.3}", persona.name(), mean);
                }
            }
            Err(e) => println!("  ANOVA: not computable ({e})"),
        }
    }

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {run_id}");
    println!("  final iteration: {}", engine.clock.current_iteration);
    println!("  total decisions: {}", engine.store().txn_count(run_id)?);
    for product in &engine.config().catalog {
        let rating = engine
            .market()
            .current_rating(product.id)
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  product {} ({}): {} reviews ({} fake), rating {}",
            product.id,
            product.name,
            engine.market().review_count(product.id),
            engine.market().fake_count(product.id),
            rating
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn epoch_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
