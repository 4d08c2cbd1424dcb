// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Counting strategies
//!
//! Each strategy consumes the conditioned confidence for one frame and
//! produces at most one increment. Exactly one runs per update, chosen by the
//! profile's [`CountingMode`].

use super::cooldown;
use super::hold::HoldConstants;
use super::{ExerciseTrackingState, Phase, TwistDirection, UpdateOutcome};
use crate::profiles::{CountingMode, ExerciseProfile};

/// Added to `low_threshold` to form the latch unlock level
pub const LATCH_UNLOCK_MARGIN: f64 = 0.03;

/// Upper bound on the latch unlock level
pub const LATCH_UNLOCK_CEILING: f64 = 0.97;

/// Signal level below which a latched exercise re-arms
pub fn unlock_level(profile: &ExerciseProfile) -> f64 {
    (profile.low_threshold + LATCH_UNLOCK_MARGIN).min(LATCH_UNLOCK_CEILING)
}

/// Inputs for one strategy step
pub(super) struct Step<'a> {
    pub profile: &'a ExerciseProfile,
    pub constants: &'a HoldConstants,
    pub confidence: f64,
    pub now: f64,
    pub visible: bool,
    pub dt: f64,
}

pub(super) fn run(state: &mut ExerciseTrackingState, step: &Step<'_>) -> UpdateOutcome {
    match step.profile.mode {
        CountingMode::Hold => hold(state, step),
        CountingMode::ContinuousExempt => UpdateOutcome::counted(continuous_exempt(state, step)),
        CountingMode::ContinuousLatched => UpdateOutcome::counted(continuous_latched(state, step)),
        CountingMode::DirectionTwist { angle_tolerance } => {
            UpdateOutcome::counted(direction_twist(state, step, angle_tolerance))
        }
        CountingMode::PeakToLow => UpdateOutcome::counted(peak_to_low(state, step)),
        CountingMode::OnPeak => UpdateOutcome::counted(on_peak(state, step)),
    }
}

/// Count if the cooldown allows it
fn try_count(state: &mut ExerciseTrackingState, step: &Step<'_>) -> bool {
    if !cooldown::eligible(state, step.profile, step.now) {
        return false;
    }
    state.repetition_count += 1;
    state.last_event_timestamp = step.now;
    true
}

fn hold(state: &mut ExerciseTrackingState, step: &Step<'_>) -> UpdateOutcome {
    let holding = step.visible && step.confidence > step.constants.hold_threshold;
    let completed = state.hold.advance(holding, step.dt, step.constants.min_hold_duration);

    UpdateOutcome {
        counted: false,
        completed_hold: completed,
    }
}

fn continuous_exempt(state: &mut ExerciseTrackingState, step: &Step<'_>) -> bool {
    step.confidence >= step.profile.high_threshold && try_count(state, step)
}

fn continuous_latched(state: &mut ExerciseTrackingState, step: &Step<'_>) -> bool {
    let mut counted = false;

    if !state.latched && step.confidence >= step.profile.high_threshold && try_count(state, step) {
        state.latched = true;
        counted = true;
    }

    if step.confidence < unlock_level(step.profile) {
        state.latched = false;
    }

    counted
}

fn direction_twist(state: &mut ExerciseTrackingState, step: &Step<'_>, tolerance: f64) -> bool {
    let direction = if step.confidence > step.profile.high_threshold + tolerance {
        TwistDirection::Right
    } else if step.confidence < step.profile.low_threshold - tolerance {
        TwistDirection::Left
    } else {
        TwistDirection::Center
    };

    let counted = direction != state.direction
        && direction != TwistDirection::Center
        && try_count(state, step);

    // Center is stored too so the next side registers as a fresh reversal
    state.direction = direction;
    counted
}

fn peak_to_low(state: &mut ExerciseTrackingState, step: &Step<'_>) -> bool {
    match state.phase {
        Phase::Low if step.confidence >= step.profile.high_threshold => {
            state.phase = Phase::High;
            false
        }
        Phase::High if step.confidence < step.profile.low_threshold => {
            state.phase = Phase::Low;
            try_count(state, step)
        }
        _ => false,
    }
}

fn on_peak(state: &mut ExerciseTrackingState, step: &Step<'_>) -> bool {
    match state.phase {
        Phase::Low if step.confidence >= step.profile.high_threshold => {
            state.phase = Phase::High;
            try_count(state, step)
        }
        Phase::High if step.confidence < step.profile.low_threshold => {
            state.phase = Phase::Low;
            false
        }
        _ => false,
    }
}
