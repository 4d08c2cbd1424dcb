// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Hold-duration accumulator for static-hold exercises

use serde::{Deserialize, Serialize};

/// Conditioned confidence a hold must exceed to accrue time
pub const HOLD_THRESHOLD: f64 = 0.55;

/// Holds at or below this many seconds are not committed to the best time
pub const MIN_HOLD_DURATION: f64 = 0.3;

/// Global hold parameters shared by every hold exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldConstants {
    pub hold_threshold: f64,
    pub min_hold_duration: f64,
}

impl Default for HoldConstants {
    fn default() -> Self {
        Self {
            hold_threshold: HOLD_THRESHOLD,
            min_hold_duration: MIN_HOLD_DURATION,
        }
    }
}

/// Current and best hold time in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoldAccumulator {
    current: f64,
    best: f64,
}

impl HoldAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame.
    ///
    /// While `holding`, the clamped `dt` is added to the running hold. On a
    /// break the running hold is committed to `best` if it lasted longer than
    /// `min_hold_duration`, then cleared. Returns the committed duration.
    pub fn advance(&mut self, holding: bool, dt: f64, min_hold_duration: f64) -> Option<f64> {
        if holding {
            self.current += dt.max(0.0);
            return None;
        }

        let finished = self.current;
        self.current = 0.0;

        if finished > min_hold_duration {
            self.best = self.best.max(finished);
            Some(finished)
        } else {
            None
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Best time including a still-running hold
    pub fn best_including_current(&self) -> f64 {
        self.best.max(self.current)
    }
}
