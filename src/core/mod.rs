//! Core engine module - routes frames from every client into the counters

mod engine;
mod event_bus;

pub use engine::{CountingEngine, FrameResult};
pub use event_bus::{CountEvent, CountEventKind, EventBus};

use serde::{Deserialize, Serialize};

/// Engine-wide counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub active_clients: usize,
    pub total_repetitions: u64,
    /// Sum of the best committed hold of every exercise, in seconds
    pub total_best_hold: f64,
    /// Currently selected exercises, sorted and deduplicated
    pub exercises_in_use: Vec<String>,
}
