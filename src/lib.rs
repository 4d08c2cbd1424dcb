// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! RepTally - Repetition and Hold-Time Counting Engine
//!
//! Turns a per-frame pose confidence signal into exercise results:
//! - Repetition counts with hysteresis, cooldown and latching
//! - Sustained-hold timing with best-time tracking
//! - Left/right alternation counting for rotational exercises
//! - Per-client, per-exercise state shared safely across connections
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     RepTally Engine                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌─────────────┐  ┌──────────┐  ┌───────────┐  │
//! │  │ Profile  │→ │   Signal    │→ │ Counting │→ │ Tracking  │  │
//! │  │ Lookup   │  │ Conditioner │  │  Modes   │  │ Snapshot  │  │
//! │  └──────────┘  └─────────────┘  └──────────┘  └───────────┘  │
//! │       ↓               ↓               ↓             ↓        │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │          Session Store (per client, per exercise)     │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! │       ↓               ↓               ↓             ↓        │
//! │  ┌──────────┐  ┌─────────────┐  ┌──────────┐  ┌───────────┐  │
//! │  │ Event    │  │   Event     │  │ Session  │  │  Trace    │  │
//! │  │ Bus      │  │  Exporter   │  │ History  │  │  Replay   │  │
//! │  └──────────┘  └─────────────┘  └──────────┘  └───────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod counting;
pub mod profiles;
pub mod session;
pub mod config;
pub mod db;
pub mod export;
pub mod replay;
pub mod simulator;
pub mod error;

// Re-exports for convenience
pub use config::Config;
pub use core::{CountEvent, CountEventKind, CountingEngine, EngineStats, EventBus, FrameResult};
pub use counting::{FrameInput, TrackingSnapshot, UpdateOutcome};
pub use profiles::{CountingMode, ExerciseProfile, ProfileTable};
pub use session::{ClientId, SessionStore, SessionSummary};
pub use db::SessionHistory;
pub use export::EventExporter;
pub use replay::{read_trace, replay, ReplayReport, TraceFrame};
pub use simulator::ConfidenceSimulator;
pub use error::{ProfileError, TraceError};

/// RepTally version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RepTally name
pub const NAME: &str = "RepTally";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
}
