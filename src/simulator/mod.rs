// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Confidence simulator for demo/testing
//!
//! Produces a plausible per-frame confidence signal for an exercise: rep
//! cycles shaped after the profile's counting mode, gaussian jitter, form
//! breaks during holds and short stretches where the person leaves the frame.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

use crate::counting::HOLD_THRESHOLD;
use crate::profiles::{CountingMode, ExerciseProfile};
use crate::replay::TraceFrame;
use crate::session::ClientId;

/// Simulates a confidence trace for one exercise
pub struct ConfidenceSimulator {
    profile: ExerciseProfile,
    fps: f64,
    rng: StdRng,

    rep_period: f64,
    noise_level: f64,
    dropout_probability: f64,
    break_probability: f64,
    hold_threshold: f64,

    // Simulation state
    time: f64,
    cycle_phase: f64,
    dropout_frames: usize,
    break_remaining: f64,
}

impl ConfidenceSimulator {
    pub fn new(profile: &ExerciseProfile, fps: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            profile: profile.clone(),
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 15.0 },
            rng,
            rep_period: default_rep_period(profile),
            noise_level: 0.03,
            dropout_probability: 0.005,
            break_probability: 0.01,
            hold_threshold: HOLD_THRESHOLD,
            time: 0.0,
            cycle_phase: 0.0,
            dropout_frames: 0,
            break_remaining: 0.0,
        }
    }

    /// Seconds per repetition cycle
    pub fn with_rep_period(mut self, seconds: f64) -> Self {
        self.rep_period = seconds.max(0.1);
        self
    }

    /// Standard deviation of the gaussian jitter
    pub fn with_noise(mut self, noise_level: f64) -> Self {
        self.noise_level = noise_level.max(0.0);
        self
    }

    /// Per-frame chance of the person leaving the frame
    pub fn with_dropout_probability(mut self, probability: f64) -> Self {
        self.dropout_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Per-frame chance of a form break while holding
    pub fn with_break_probability(mut self, probability: f64) -> Self {
        self.break_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_hold_threshold(mut self, hold_threshold: f64) -> Self {
        self.hold_threshold = hold_threshold;
        self
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Produce the next frame and advance the clock by one frame
    pub fn next_frame(&mut self, client: &ClientId, exercise: &str) -> TraceFrame {
        let timestamp = self.time;
        let dt = 1.0 / self.fps;

        let visible = self.step_visibility();
        let confidence = if visible {
            let clean = self.waveform(dt);
            let jitter = self.rng.sample::<f64, _>(StandardNormal) * self.noise_level;
            (clean + jitter).clamp(0.0, 1.0)
        } else {
            self.rng.gen_range(0.0..0.1)
        };

        self.time += dt;
        self.cycle_phase = (self.cycle_phase + dt / self.rep_period).fract();

        TraceFrame {
            client: Some(client.to_string()),
            exercise: exercise.to_string(),
            confidence,
            timestamp,
            visible,
        }
    }

    /// Frames covering `duration_secs`
    pub fn generate(&mut self, client: &ClientId, exercise: &str, duration_secs: f64) -> Vec<TraceFrame> {
        let count = (duration_secs.max(0.0) * self.fps).round() as usize;
        (0..count).map(|_| self.next_frame(client, exercise)).collect()
    }

    fn step_visibility(&mut self) -> bool {
        if self.dropout_frames > 0 {
            self.dropout_frames -= 1;
            return false;
        }
        if self.dropout_probability > 0.0 && self.rng.gen::<f64>() < self.dropout_probability {
            // Gone for a quarter to one second
            let frames = self.rng.gen_range(0.25..1.0) * self.fps;
            self.dropout_frames = (frames as usize).saturating_sub(1);
            return false;
        }
        true
    }

    fn waveform(&mut self, dt: f64) -> f64 {
        let high = self.profile.high_threshold;
        let low = self.profile.low_threshold;

        match self.profile.mode {
            CountingMode::Hold => self.hold_level(dt),
            CountingMode::DirectionTwist { angle_tolerance } => {
                let center = (high + low) / 2.0;
                let amplitude = (high - low) / 2.0 + angle_tolerance + 0.1;
                center + amplitude * (2.0 * PI * self.cycle_phase).sin()
            }
            CountingMode::ContinuousExempt
            | CountingMode::ContinuousLatched
            | CountingMode::PeakToLow
            | CountingMode::OnPeak => {
                let rest = (low - 0.15).max(0.02);
                let peak = (high + 0.15).min(0.98);
                let lift = 0.5 - 0.5 * (2.0 * PI * self.cycle_phase).cos();
                rest + (peak - rest) * lift
            }
        }
    }

    fn hold_level(&mut self, dt: f64) -> f64 {
        if self.break_remaining > 0.0 {
            self.break_remaining -= dt;
            return (self.hold_threshold - 0.3).max(0.0);
        }
        if self.break_probability > 0.0 && self.rng.gen::<f64>() < self.break_probability {
            self.break_remaining = self.rng.gen_range(0.5..1.5);
        }
        (self.hold_threshold + 0.2).min(0.98)
    }
}

/// Slow enough that every cycle clears the cooldown
fn default_rep_period(profile: &ExerciseProfile) -> f64 {
    match profile.mode {
        CountingMode::Hold => 1.0,
        CountingMode::DirectionTwist { .. } => (profile.cooldown_seconds * 2.0).max(1.5),
        _ => (profile.cooldown_seconds * 1.5).max(1.5),
    }
}
