//! Subsystem trait and phase context.
//!
//! RULE: Every population implements SimSubsystem.
//! The engine calls update() on each registered subsystem in
//! registration order, every iteration. Registration order IS the
//! phase order: all reviewer output is written before the first
//! shopper reads. Execution order is fixed and documented in engine.rs.

use crate::{
    catalog::ProductSpec,
    config::SimConfig,
    error::SimResult,
    event::SimEvent,
    market::MarketState,
    rng::SubsystemRng,
    store::SimStore,
    textgen::TextGenerator,
    types::Iteration,
};

/// Everything a population may touch during its phase. The market
/// state is owned by the engine and passed down explicitly — no
/// ambient globals.
pub struct PhaseContext<'a> {
    pub config: &'a SimConfig,
    pub catalog: &'a [ProductSpec],
    pub market: &'a mut MarketState,
    pub store: &'a SimStore,
    pub textgen: &'a mut dyn TextGenerator,
}

/// The contract every population must fulfill.
pub trait SimSubsystem {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per iteration by the engine.
    ///
    /// - `iteration`: the current iteration number
    /// - `ctx`:       market state, store, config, text generator
    /// - `rng`:       this subsystem's deterministic RNG
    ///
    /// Returns a vec of new events to add to the iteration's event log.
    fn update(
        &mut self,
        iteration: Iteration,
        ctx: &mut PhaseContext<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;
}
