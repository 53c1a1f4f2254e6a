//! astroturf-core — a deterministic agent-based simulation of fake
//! review campaigns in an online marketplace.
//!
//! A run is a fixed number of discrete iterations. Each iteration has
//! two strictly ordered phases: the reviewer population posts genuine
//! and campaign reviews, then the shopper population reads the pool
//! and records one buy/no-buy decision per agent. Everything persists
//! to SQLite: an append-only event log plus immutable review and
//! transaction tables the analysis engine reads after the run.
//!
//! Determinism is a hard guarantee: one master seed, per-population
//! PCG streams, no platform RNG, no wall-clock input to any decision.
//! Two runs with the same seed and config produce identical event
//! payloads, reviews, and transactions.

pub mod campaign;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod distributions;
pub mod engine;
pub mod error;
pub mod event;
pub mod market;
pub mod reviewer;
pub mod rng;
pub mod shopper;
pub mod stats;
pub mod store;
pub mod subsystem;
pub mod textgen;
pub mod types;
