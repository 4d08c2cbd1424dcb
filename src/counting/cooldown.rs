// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Minimum spacing between counted events

use super::ExerciseTrackingState;
use crate::profiles::ExerciseProfile;

/// True once `cooldown_seconds` have passed since the last counted event.
///
/// Pure check. The mode that actually counts stamps `last_event_timestamp`.
pub fn eligible(state: &ExerciseTrackingState, profile: &ExerciseProfile, now: f64) -> bool {
    cooldown_elapsed(state.last_event_timestamp, profile.cooldown_seconds, now)
}

pub(crate) fn cooldown_elapsed(last_event: f64, cooldown_seconds: f64, now: f64) -> bool {
    now - last_event >= cooldown_seconds
}
