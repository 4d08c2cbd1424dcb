// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Exercise profile table - per-exercise thresholds and counting modes

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileError;

/// How an exercise turns its conditioned signal into events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CountingMode {
    /// Static hold, measured in seconds instead of repetitions
    Hold,
    /// Threshold + cooldown only, keeps counting while the signal stays high
    ContinuousExempt,
    /// Threshold + cooldown, latched until the signal drops into the unlock band
    ContinuousLatched,
    /// Counts every reversal between left and right
    DirectionTwist {
        /// Extra margin outside the thresholds before a side registers
        angle_tolerance: f64,
    },
    /// Up then down, counted on the down-crossing
    PeakToLow,
    /// Counted on the up-crossing
    OnPeak,
}

impl CountingMode {
    /// Short stable name used in logs and exports
    pub fn name(&self) -> &'static str {
        match self {
            CountingMode::Hold => "hold",
            CountingMode::ContinuousExempt => "continuous_exempt",
            CountingMode::ContinuousLatched => "continuous_latched",
            CountingMode::DirectionTwist { .. } => "direction_twist",
            CountingMode::PeakToLow => "peak_to_low",
            CountingMode::OnPeak => "on_peak",
        }
    }

    /// Whether this mode reports hold durations rather than repetitions
    pub fn is_hold(&self) -> bool {
        matches!(self, CountingMode::Hold)
    }
}

/// Immutable counting parameters for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    /// Signal at or above this counts as engaged
    pub high_threshold: f64,

    /// Signal below this counts as disengaged
    pub low_threshold: f64,

    /// Trailing frames averaged by the conditioner
    #[serde(default = "default_window")]
    pub smoothing_window: usize,

    /// Bypass smoothing for modes that must catch short spikes
    #[serde(default)]
    pub use_raw_signal: bool,

    /// Minimum spacing between counted events
    pub cooldown_seconds: f64,

    /// Counting strategy
    pub mode: CountingMode,
}

fn default_window() -> usize {
    2
}

impl Default for ExerciseProfile {
    fn default() -> Self {
        Self {
            high_threshold: 0.45,
            low_threshold: 0.28,
            smoothing_window: 2,
            use_raw_signal: false,
            mode: CountingMode::PeakToLow,
            cooldown_seconds: 0.7,
        }
    }
}

impl ExerciseProfile {
    pub fn new(high_threshold: f64, low_threshold: f64, mode: CountingMode, cooldown_seconds: f64) -> Self {
        Self {
            high_threshold,
            low_threshold,
            mode,
            cooldown_seconds,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, smoothing_window: usize) -> Self {
        self.smoothing_window = smoothing_window;
        self
    }

    pub fn raw(mut self) -> Self {
        self.use_raw_signal = true;
        self
    }

    /// Tolerance used by the twist mode, zero for every other mode
    pub fn angle_tolerance(&self) -> f64 {
        match self.mode {
            CountingMode::DirectionTwist { angle_tolerance } => angle_tolerance,
            _ => 0.0,
        }
    }

    /// Reject profiles the counting modes cannot run on
    pub fn validate(&self, exercise: &str) -> Result<(), ProfileError> {
        let invalid = |reason: String| ProfileError::Invalid {
            exercise: exercise.to_string(),
            reason,
        };

        if self.smoothing_window == 0 {
            return Err(invalid("smoothing_window must be at least 1".to_string()));
        }
        if !self.high_threshold.is_finite() || !self.low_threshold.is_finite() {
            return Err(invalid("thresholds must be finite".to_string()));
        }
        if self.low_threshold > self.high_threshold {
            return Err(invalid(format!(
                "low_threshold {} is above high_threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        if !self.cooldown_seconds.is_finite() || self.cooldown_seconds < 0.0 {
            return Err(invalid(format!("cooldown_seconds {} is not a valid duration", self.cooldown_seconds)));
        }
        if !self.angle_tolerance().is_finite() || self.angle_tolerance() < 0.0 {
            return Err(invalid(format!("angle_tolerance {} must be non-negative", self.angle_tolerance())));
        }
        Ok(())
    }
}

/// Lookup table from exercise name to profile
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: HashMap<String, ExerciseProfile>,
    fallback: ExerciseProfile,
}

impl ProfileTable {
    /// Empty table, every lookup resolves to the default profile
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
            fallback: ExerciseProfile::default(),
        }
    }

    /// Table with the shipped exercise catalogue
    pub fn builtin() -> Self {
        let mut table = Self::empty();

        let entries = vec![
            ("Bodyweight Squat", ExerciseProfile::new(0.50, 0.30, CountingMode::PeakToLow, 0.8)),
            ("Push-ups", ExerciseProfile::new(0.75, 0.30, CountingMode::ContinuousExempt, 2.0).with_window(1).raw()),
            ("Sit-ups", ExerciseProfile::new(0.45, 0.28, CountingMode::PeakToLow, 0.8)),
            ("Lunge (Split Squat)", ExerciseProfile::new(0.35, 0.20, CountingMode::OnPeak, 0.8)),
            ("Plank", ExerciseProfile::new(0.55, 0.35, CountingMode::Hold, 0.7).with_window(3)),
            ("Side Plank", ExerciseProfile::new(0.55, 0.35, CountingMode::Hold, 0.7).with_window(3)),
            ("Dead Bug", ExerciseProfile::new(0.75, 0.30, CountingMode::ContinuousExempt, 1.9).with_window(1).raw()),
            ("Lying Leg Raises", ExerciseProfile::new(0.75, 0.45, CountingMode::ContinuousLatched, 1.0).with_window(1).raw()),
            (
                "Russian Twist",
                ExerciseProfile::new(0.30, 0.10, CountingMode::DirectionTwist { angle_tolerance: 0.10 }, 0.5)
                    .with_window(1)
                    .raw(),
            ),
        ];

        for (name, profile) in entries {
            table.insert(name, profile);
        }

        table
    }

    pub fn insert(&mut self, exercise: &str, profile: ExerciseProfile) {
        self.profiles.insert(exercise.to_string(), profile);
    }

    /// Profile for an exercise, or the default profile for unknown names
    pub fn lookup(&self, exercise: &str) -> &ExerciseProfile {
        match self.profiles.get(exercise) {
            Some(profile) => profile,
            None => {
                debug!("No profile for '{}', using default", exercise);
                &self.fallback
            }
        }
    }

    pub fn contains(&self, exercise: &str) -> bool {
        self.profiles.contains_key(exercise)
    }

    pub fn fallback(&self) -> &ExerciseProfile {
        &self.fallback
    }

    /// Exercise names in sorted order
    pub fn exercises(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Exercises measured by hold duration
    pub fn hold_exercises(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.iter()
            .filter(|(_, p)| p.mode.is_hold())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Validate and merge overrides on top of this table
    pub fn with_overrides(mut self, overrides: &HashMap<String, ExerciseProfile>) -> Result<Self, ProfileError> {
        for (exercise, profile) in overrides {
            profile.validate(exercise)?;
            self.insert(exercise, profile.clone());
        }
        Ok(self)
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}
