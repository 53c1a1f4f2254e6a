//! Shared primitive types used across the entire simulation.

/// One discrete simulated time step of the market.
pub type Iteration = u64;

/// A stable, unique identifier for a review or transaction record.
pub type EntityId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Catalog product identifier. Assigned once at setup, never reused.
pub type ProductId = u32;
