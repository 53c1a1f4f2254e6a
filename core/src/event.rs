//! Engine lifecycle events, persisted as JSON rows in `event_log`.
//!
//! RULE: events summarize what a phase did; the authoritative review
//! and transaction records live in their own append-only tables.
//! Variants are added over time — never removed or reordered.

use crate::campaign::CampaignPhase;
use crate::types::{Iteration, ProductId, RunId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    IterationStarted {
        iteration: Iteration,
        phase: CampaignPhase,
    },
    IterationCompleted {
        iteration: Iteration,
        reviews_posted: u32,
        decisions_recorded: u32,
    },
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },

    // ── Review phase events ────────────────────────
    GenuineReviewsPosted {
        iteration: Iteration,
        product_id: ProductId,
        count: u32,
    },
    FakeReviewsInjected {
        iteration: Iteration,
        product_id: ProductId,
        count: u32,
        phase: CampaignPhase,
        rating_after: f64,
    },

    // ── Decision phase events ──────────────────────
    DecisionsRecorded {
        iteration: Iteration,
        product_id: ProductId,
        persona: String,
        buys: u32,
        total: u32,
    },

    // ── Anomalies (logged, counted, not fatal) ─────
    EmptyPopulationObserved {
        iteration: Iteration,
        population: String,
    },
}

/// Extract a stable string name from a SimEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::IterationStarted { .. } => "iteration_started",
        SimEvent::IterationCompleted { .. } => "iteration_completed",
        SimEvent::RunInitialized { .. } => "run_initialized",
        SimEvent::GenuineReviewsPosted { .. } => "genuine_reviews_posted",
        SimEvent::FakeReviewsInjected { .. } => "fake_reviews_injected",
        SimEvent::DecisionsRecorded { .. } => "decisions_recorded",
        SimEvent::EmptyPopulationObserved { .. } => "empty_population_observed",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub iteration: Iteration,
    pub subsystem: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
