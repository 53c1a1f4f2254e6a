//! The simulation engine — the heart of the astroturf study.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Reviewer population  (Phase 1: genuine reviews, then fakes)
//!   2. Shopper population   (Phase 2: purchase decisions)
//!
//! RULES:
//!   - Populations execute in registration order, every iteration.
//!   - Phase 2 reads the review pool exactly as Phase 1 left it.
//!   - All randomness flows through the RngBank; each population's
//!     stream is created once at build time and advances for the
//!     whole run, so iteration N+1 never replays iteration N's draws.
//!   - An iteration commits as one transaction. A generation failure
//!     rolls the whole iteration back and halts the run.

use crate::{
    campaign::CampaignSchedule,
    clock::SimClock,
    config::SimConfig,
    error::{SimError, SimResult},
    event::{event_type_name, EventLogEntry, SimEvent},
    market::MarketState,
    reviewer::ReviewerPopulation,
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    shopper::ShopperPopulation,
    store::SimStore,
    subsystem::{PhaseContext, SimSubsystem},
    textgen::{TemplateGenerator, TextGenerator},
    types::{Iteration, RunId},
};

pub struct SimEngine {
    pub run_id: RunId,
    pub clock: SimClock,
    seed: u64,
    config: SimConfig,
    schedule: CampaignSchedule,
    market: MarketState,
    subsystems: Vec<(Box<dyn SimSubsystem>, SubsystemRng)>,
    textgen: Box<dyn TextGenerator>,
    store: SimStore,
    /// Set when an iteration aborts. A halted engine refuses further
    /// steps: resuming would silently skip the rolled-back iteration.
    halted: Option<Iteration>,
}

impl SimEngine {
    /// Build a fully wired engine with both populations registered and
    /// the deterministic template generator on its own RNG stream.
    pub fn build(run_id: RunId, seed: u64, store: SimStore, config: SimConfig) -> SimResult<Self> {
        let bank = RngBank::new(seed);
        let textgen = Box::new(TemplateGenerator::new(
            bank.for_subsystem(SubsystemSlot::TextGen),
        ));
        Self::build_with_generator(run_id, seed, store, config, textgen)
    }

    /// Build with a caller-supplied text generator. Tests use this to
    /// inject failing generators; a deployment could wire in a remote
    /// LLM client here.
    pub fn build_with_generator(
        run_id: RunId,
        seed: u64,
        store: SimStore,
        config: SimConfig,
        textgen: Box<dyn TextGenerator>,
    ) -> SimResult<Self> {
        config.validate()?;
        store.migrate()?;

        let bank = RngBank::new(seed);
        let schedule = CampaignSchedule::from_config(&config);
        let market = MarketState::new(config.catalog.iter().map(|p| p.id));

        // EXECUTION ORDER — fixed, documented, never reordered.
        let subsystems: Vec<(Box<dyn SimSubsystem>, SubsystemRng)> = vec![
            (
                Box::new(ReviewerPopulation::new(run_id.clone(), schedule.clone())),
                bank.for_subsystem(SubsystemSlot::Reviewer),
            ),
            (
                Box::new(ShopperPopulation::new(run_id.clone())),
                bank.for_subsystem(SubsystemSlot::Shopper),
            ),
        ];

        Ok(Self {
            clock: SimClock::new(run_id.clone()),
            seed,
            config,
            schedule,
            market,
            subsystems,
            textgen,
            store,
            run_id,
            halted: None,
        })
    }

    /// Advance one iteration: Phase 1 then Phase 2, committed as a
    /// unit. On error every trace of the iteration is rolled back —
    /// the SQLite transaction and the in-memory market aggregates —
    /// and the engine halts: a resumed run would skip the aborted
    /// iteration and break the committed-history invariant.
    pub fn step(&mut self) -> SimResult<Vec<SimEvent>> {
        assert!(!self.clock.paused, "step() called on paused engine");
        if let Some(iteration) = self.halted {
            return Err(SimError::Halted { iteration });
        }

        let iteration = self.clock.advance();
        let market_before = self.market.clone();
        self.store.begin_iteration()?;
        match self.run_iteration(iteration) {
            Ok(events) => {
                self.store.commit_iteration()?;
                Ok(events)
            }
            Err(e) => {
                log::error!("iteration {iteration} failed, rolling back: {e}");
                self.store.rollback_iteration()?;
                self.market = market_before;
                self.halted = Some(iteration);
                Err(e)
            }
        }
    }

    fn run_iteration(&mut self, iteration: Iteration) -> SimResult<Vec<SimEvent>> {
        let mut events = vec![SimEvent::IterationStarted {
            iteration,
            phase: self.schedule.phase(iteration),
        }];
        self.persist_event(iteration, "engine", &events[0])?;

        for (subsystem, rng) in &mut self.subsystems {
            let mut ctx = PhaseContext {
                config: &self.config,
                catalog: &self.config.catalog,
                market: &mut self.market,
                store: &self.store,
                textgen: self.textgen.as_mut(),
            };
            let new_events = subsystem.update(iteration, &mut ctx, rng)?;
            for event in &new_events {
                let entry = EventLogEntry {
                    id: None,
                    run_id: self.run_id.clone(),
                    iteration,
                    subsystem: subsystem.name().to_string(),
                    event_type: event_type_name(event).to_string(),
                    payload: serde_json::to_string(event)?,
                };
                self.store.append_event(&entry)?;
            }
            events.extend(new_events);
        }

        let reviews_posted = events
            .iter()
            .map(|e| match e {
                SimEvent::GenuineReviewsPosted { count, .. }
                | SimEvent::FakeReviewsInjected { count, .. } => *count,
                _ => 0,
            })
            .sum();
        let decisions_recorded = events
            .iter()
            .map(|e| match e {
                SimEvent::DecisionsRecorded { total, .. } => *total,
                _ => 0,
            })
            .sum();
        let completed = SimEvent::IterationCompleted {
            iteration,
            reviews_posted,
            decisions_recorded,
        };
        self.persist_event(iteration, "engine", &completed)?;
        events.push(completed);
        Ok(events)
    }

    /// Run the configured number of iterations from a fresh clock.
    /// A failed iteration halts the run with its writes rolled back;
    /// everything committed before it stays committed.
    pub fn run(&mut self) -> SimResult<()> {
        if self.clock.current_iteration == 0 {
            self.store
                .insert_run(&self.run_id, self.seed, env!("CARGO_PKG_VERSION"))?;
            let init = SimEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed: self.seed,
            };
            self.persist_event(0, "engine", &init)?;
            log::info!(
                "run {} initialized: seed {}, {} iterations",
                self.run_id,
                self.seed,
                self.config.total_iterations
            );
        }
        self.clock.resume();
        let result = self.run_steps(self.config.total_iterations);
        self.clock.pause();
        result
    }

    fn run_steps(&mut self, n: u64) -> SimResult<()> {
        let remaining = n.saturating_sub(self.clock.current_iteration);
        for _ in 0..remaining {
            self.step()?;
        }
        Ok(())
    }

    fn persist_event(
        &self,
        iteration: Iteration,
        subsystem: &str,
        event: &SimEvent,
    ) -> SimResult<()> {
        let entry = EventLogEntry {
            id: None,
            run_id: self.run_id.clone(),
            iteration,
            subsystem: subsystem.to_string(),
            event_type: event_type_name(event).to_string(),
            payload: serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    /// Query events for a specific iteration from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_iteration(
        &self,
        run_id: &str,
        iteration: Iteration,
    ) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_iteration(run_id, iteration)
    }
}
