//! Counting module - per-(client, exercise) repetition and hold state
//!
//! One update per frame: the raw confidence is conditioned, then exactly one
//! counting strategy runs against the conditioned value.

mod conditioner;
mod modes;
mod hold;
pub mod cooldown;

pub use conditioner::SignalConditioner;
pub use hold::{HoldAccumulator, HoldConstants, HOLD_THRESHOLD, MIN_HOLD_DURATION};
pub use modes::{unlock_level, LATCH_UNLOCK_CEILING, LATCH_UNLOCK_MARGIN};

use serde::{Deserialize, Serialize};

use crate::profiles::ExerciseProfile;

/// Hysteresis phase for threshold-crossing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Low,
    High,
}

/// Side of a bidirectional movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwistDirection {
    #[default]
    Center,
    Left,
    Right,
}

/// One frame of input for a single exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Raw confidence from the external scorer, nominally in [0, 1]
    pub confidence: f64,
    /// Caller clock in seconds
    pub timestamp: f64,
    /// Full-body visibility, only consulted by hold exercises
    pub visible: bool,
}

impl FrameInput {
    pub fn new(confidence: f64, timestamp: f64) -> Self {
        Self {
            confidence,
            timestamp,
            visible: true,
        }
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// What a single update produced
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UpdateOutcome {
    /// A repetition was counted on this frame
    pub counted: bool,
    /// A hold ended on this frame and was long enough to be kept
    pub completed_hold: Option<f64>,
}

impl UpdateOutcome {
    fn counted(counted: bool) -> Self {
        Self {
            counted,
            completed_hold: None,
        }
    }
}

/// Mutable tracking state for one exercise of one client
#[derive(Debug, Clone, Default)]
pub struct ExerciseTrackingState {
    conditioner: SignalConditioner,
    phase: Phase,
    direction: TwistDirection,
    latched: bool,
    last_event_timestamp: f64,
    repetition_count: u64,
    hold: HoldAccumulator,
    last_confidence: f64,
    last_update_timestamp: Option<f64>,
}

impl ExerciseTrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame.
    ///
    /// `dt` is the time since the client's previous update; only hold
    /// exercises use it and negative values accrue nothing. Non-finite
    /// confidence is read as 0.0 so it cannot enter the smoothing history.
    pub fn apply(
        &mut self,
        profile: &ExerciseProfile,
        constants: &HoldConstants,
        frame: &FrameInput,
        dt: f64,
    ) -> UpdateOutcome {
        let raw = if frame.confidence.is_finite() { frame.confidence } else { 0.0 };
        let confidence = self.conditioner.condition(raw, profile);

        let step = modes::Step {
            profile,
            constants,
            confidence,
            now: frame.timestamp,
            visible: frame.visible,
            dt: if dt.is_finite() { dt.max(0.0) } else { 0.0 },
        };
        let outcome = modes::run(self, &step);

        self.last_confidence = confidence;
        self.last_update_timestamp = Some(frame.timestamp);
        outcome
    }

    /// Clear gesture state that must not survive a re-selection.
    ///
    /// Counters, holds and the cooldown clock are kept.
    pub fn rearm(&mut self) {
        self.latched = false;
        self.direction = TwistDirection::Center;
    }

    pub fn repetition_count(&self) -> u64 {
        self.repetition_count
    }

    pub fn hold_current(&self) -> f64 {
        self.hold.current()
    }

    pub fn hold_best(&self) -> f64 {
        self.hold.best()
    }

    pub fn last_confidence(&self) -> f64 {
        self.last_confidence
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn direction(&self) -> TwistDirection {
        self.direction
    }

    pub fn latched(&self) -> bool {
        self.latched
    }

    pub fn last_event_timestamp(&self) -> f64 {
        self.last_event_timestamp
    }

    pub fn last_update_timestamp(&self) -> Option<f64> {
        self.last_update_timestamp
    }

    pub fn conditioner(&self) -> &SignalConditioner {
        &self.conditioner
    }

    pub fn snapshot(&self, exercise: &str, profile: &ExerciseProfile) -> TrackingSnapshot {
        TrackingSnapshot {
            exercise: exercise.to_string(),
            mode: profile.mode.name().to_string(),
            repetition_count: self.repetition_count,
            hold_current: self.hold.current(),
            hold_best: self.hold.best(),
            last_confidence: self.last_confidence,
            phase: self.phase,
            direction: self.direction,
            latched: self.latched,
            last_event_timestamp: self.last_event_timestamp,
            last_update_timestamp: self.last_update_timestamp,
        }
    }
}

/// Read-only copy of an exercise's state after an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub exercise: String,
    pub mode: String,
    pub repetition_count: u64,
    pub hold_current: f64,
    pub hold_best: f64,
    pub last_confidence: f64,
    pub phase: Phase,
    pub direction: TwistDirection,
    pub latched: bool,
    pub last_event_timestamp: f64,
    pub last_update_timestamp: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::CountingMode;

    fn squat() -> ExerciseProfile {
        ExerciseProfile::new(0.50, 0.30, CountingMode::PeakToLow, 0.8).with_window(1)
    }

    fn apply(state: &mut ExerciseTrackingState, profile: &ExerciseProfile, frame: FrameInput, dt: f64) -> UpdateOutcome {
        state.apply(profile, &HoldConstants::default(), &frame, dt)
    }

    #[test]
    fn test_squat_scenario() {
        let profile = squat();
        let mut state = ExerciseTrackingState::new();

        apply(&mut state, &profile, FrameInput::new(0.1, 0.0), 0.0);
        assert_eq!(state.phase(), Phase::Low);

        apply(&mut state, &profile, FrameInput::new(0.6, 0.2), 0.2);
        assert_eq!(state.phase(), Phase::High);
        assert_eq!(state.repetition_count(), 0);

        let outcome = apply(&mut state, &profile, FrameInput::new(0.2, 1.1), 0.9);
        assert!(outcome.counted);
        assert_eq!(state.phase(), Phase::Low);
        assert_eq!(state.repetition_count(), 1);
        assert_eq!(state.last_event_timestamp(), 1.1);
    }

    #[test]
    fn test_cooldown_enforcement() {
        let profile = squat();

        // Full cycle inside the cooldown of a previous event
        let mut state = ExerciseTrackingState::new();
        for (c, t) in [(0.6, 1.0), (0.1, 1.1)] {
            apply(&mut state, &profile, FrameInput::new(c, t), 0.1);
        }
        assert_eq!(state.repetition_count(), 1);
        for (c, t) in [(0.6, 1.3), (0.1, 1.5)] {
            apply(&mut state, &profile, FrameInput::new(c, t), 0.1);
        }
        assert_eq!(state.repetition_count(), 1);
        assert_eq!(state.phase(), Phase::Low);

        // Same cycle after the cooldown elapses
        for (c, t) in [(0.6, 2.0), (0.1, 2.2)] {
            apply(&mut state, &profile, FrameInput::new(c, t), 0.1);
        }
        assert_eq!(state.repetition_count(), 2);
    }

    #[test]
    fn test_latch_idempotence() {
        let profile = ExerciseProfile::new(0.75, 0.45, CountingMode::ContinuousLatched, 1.0).raw();

        for n in [1usize, 5, 50] {
            let mut state = ExerciseTrackingState::new();
            for i in 0..n {
                apply(&mut state, &profile, FrameInput::new(0.75 + 1e-6, 2.0 + i as f64), 1.0);
            }
            assert_eq!(state.repetition_count(), 1, "n = {}", n);
        }
    }

    #[test]
    fn test_plank_scenario() {
        let profile = ExerciseProfile::new(0.55, 0.35, CountingMode::Hold, 0.7).with_window(3);
        let constants = HoldConstants::default();
        let mut state = ExerciseTrackingState::new();

        state.apply(&profile, &constants, &FrameInput::new(0.7, 0.0), 0.0);
        state.apply(&profile, &constants, &FrameInput::new(0.7, 1.0), 1.0);
        state.apply(&profile, &constants, &FrameInput::new(0.7, 2.0), 1.0);
        assert!((state.hold_current() - 2.0).abs() < 1e-12);

        let outcome = state.apply(&profile, &constants, &FrameInput::new(0.7, 3.0).with_visibility(false), 1.0);
        assert_eq!(outcome.completed_hold, Some(2.0));
        assert_eq!(state.hold_best(), 2.0);
        assert_eq!(state.hold_current(), 0.0);
        assert_eq!(state.repetition_count(), 0);
    }

    #[test]
    fn test_hold_break_on_low_confidence() {
        let profile = ExerciseProfile::new(0.55, 0.35, CountingMode::Hold, 0.7).with_window(1);
        let mut state = ExerciseTrackingState::new();

        apply(&mut state, &profile, FrameInput::new(0.9, 0.0), 0.0);
        apply(&mut state, &profile, FrameInput::new(0.9, 0.5), 0.5);
        // Exactly at the threshold does not hold
        apply(&mut state, &profile, FrameInput::new(HOLD_THRESHOLD, 1.0), 0.5);
        assert_eq!(state.hold_current(), 0.0);
        assert_eq!(state.hold_best(), 0.5);
    }

    #[test]
    fn test_direction_alternation() {
        let profile = ExerciseProfile::new(0.3, 0.2, CountingMode::DirectionTwist { angle_tolerance: 0.1 }, 0.5)
            .with_window(1)
            .raw();
        let mut state = ExerciseTrackingState::new();

        let mut increments = Vec::new();
        for (i, c) in [0.5, 0.5, 0.0, 0.5].into_iter().enumerate() {
            let outcome = apply(&mut state, &profile, FrameInput::new(c, i as f64), 1.0);
            increments.push(outcome.counted);
        }

        // The first Right falls inside the cooldown that starts at t=0
        assert_eq!(increments, vec![false, false, true, true]);
        assert_eq!(state.repetition_count(), 2);
        assert_eq!(state.direction(), TwistDirection::Right);
    }

    #[test]
    fn test_monotonic_counters_under_noise() {
        let profiles = [
            squat(),
            ExerciseProfile::new(0.35, 0.20, CountingMode::OnPeak, 0.8),
            ExerciseProfile::new(0.75, 0.30, CountingMode::ContinuousExempt, 2.0).raw(),
            ExerciseProfile::new(0.75, 0.45, CountingMode::ContinuousLatched, 1.0).raw(),
            ExerciseProfile::new(0.30, 0.10, CountingMode::DirectionTwist { angle_tolerance: 0.1 }, 0.5).raw(),
            ExerciseProfile::new(0.55, 0.35, CountingMode::Hold, 0.7).with_window(3),
        ];

        for profile in &profiles {
            let mut state = ExerciseTrackingState::new();
            let (mut reps, mut best) = (0, 0.0);
            let mut t = 0.0;
            for i in 0..400u32 {
                // Deterministic jitter around a slow wave, with a clock that sometimes steps back
                let wave = ((i as f64) * 0.21).sin() * 0.5 + 0.5;
                let jitter = (((i * 7919) % 13) as f64 - 6.0) * 0.02;
                let dt = if i % 37 == 0 { -0.2 } else { 0.05 };
                t += dt;
                let frame = FrameInput::new((wave + jitter).clamp(0.0, 1.0), t).with_visibility(i % 50 != 0);
                apply(&mut state, profile, frame, dt);

                assert!(state.repetition_count() >= reps);
                assert!(state.hold_best() >= best);
                assert!(state.hold_current() >= 0.0);
                reps = state.repetition_count();
                best = state.hold_best();
            }
        }
    }

    #[test]
    fn test_non_finite_confidence_is_zero() {
        let profile = ExerciseProfile::new(0.5, 0.3, CountingMode::PeakToLow, 0.0).with_window(2);
        let mut state = ExerciseTrackingState::new();

        apply(&mut state, &profile, FrameInput::new(f64::NAN, 0.0), 0.0);
        assert_eq!(state.last_confidence(), 0.0);
        apply(&mut state, &profile, FrameInput::new(1.0, 0.1), 0.1);
        assert_eq!(state.last_confidence(), 0.5);
        apply(&mut state, &profile, FrameInput::new(f64::INFINITY, 0.2), 0.1);
        assert!(state.last_confidence().is_finite());
    }

    #[test]
    fn test_rearm_keeps_counters() {
        let profile = ExerciseProfile::new(0.75, 0.45, CountingMode::ContinuousLatched, 1.0).raw();
        let mut state = ExerciseTrackingState::new();

        apply(&mut state, &profile, FrameInput::new(0.9, 5.0), 0.0);
        assert!(state.latched());
        state.rearm();
        assert!(!state.latched());
        assert_eq!(state.repetition_count(), 1);
        assert_eq!(state.last_event_timestamp(), 5.0);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let profile = squat();
        let mut state = ExerciseTrackingState::new();
        apply(&mut state, &profile, FrameInput::new(0.6, 1.0), 0.0);

        let snap = state.snapshot("Bodyweight Squat", &profile);
        assert_eq!(snap.exercise, "Bodyweight Squat");
        assert_eq!(snap.mode, "peak_to_low");
        assert_eq!(snap.phase, Phase::High);
        assert_eq!(snap.last_confidence, 0.6);
        assert_eq!(snap.last_update_timestamp, Some(1.0));
    }
}
