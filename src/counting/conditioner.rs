// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Trailing-window smoothing of the raw confidence signal

use std::collections::VecDeque;

use crate::profiles::ExerciseProfile;

/// Per-(client, exercise) smoothing buffer
#[derive(Debug, Clone, Default)]
pub struct SignalConditioner {
    history: VecDeque<f64>,
}

impl SignalConditioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the counting mode will consume for this frame.
    ///
    /// Raw-signal profiles get the input back untouched; the value is still
    /// kept in the bounded history so diagnostics can show it. Otherwise the
    /// mean of the last `smoothing_window` inputs is returned.
    pub fn condition(&mut self, raw: f64, profile: &ExerciseProfile) -> f64 {
        let window = profile.smoothing_window.max(1);

        self.history.push_back(raw);
        while self.history.len() > window {
            self.history.pop_front();
        }

        if profile.use_raw_signal {
            return raw;
        }

        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// Retained values, oldest first
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::CountingMode;

    fn smoothed(window: usize) -> ExerciseProfile {
        ExerciseProfile::new(0.5, 0.3, CountingMode::PeakToLow, 0.8).with_window(window)
    }

    #[test]
    fn test_mean_over_window() {
        let profile = smoothed(3);
        let mut conditioner = SignalConditioner::new();

        assert!((conditioner.condition(0.3, &profile) - 0.3).abs() < 1e-12);
        assert!((conditioner.condition(0.6, &profile) - 0.45).abs() < 1e-12);
        assert!((conditioner.condition(0.9, &profile) - 0.6).abs() < 1e-12);
        // 0.3 is evicted
        assert!((conditioner.condition(0.0, &profile) - 0.5).abs() < 1e-12);
        assert_eq!(conditioner.len(), 3);
        assert_eq!(conditioner.history().collect::<Vec<_>>(), vec![0.6, 0.9, 0.0]);
    }

    #[test]
    fn test_raw_signal_passes_through() {
        let profile = smoothed(4).raw();
        let mut conditioner = SignalConditioner::new();

        assert_eq!(conditioner.condition(0.2, &profile), 0.2);
        assert_eq!(conditioner.condition(0.9, &profile), 0.9);
        assert_eq!(conditioner.len(), 2);
    }

    #[test]
    fn test_zero_window_behaves_like_one() {
        let mut profile = smoothed(1);
        profile.smoothing_window = 0;
        let mut conditioner = SignalConditioner::new();

        conditioner.condition(0.1, &profile);
        assert_eq!(conditioner.condition(0.7, &profile), 0.7);
        assert_eq!(conditioner.len(), 1);
    }

    #[test]
    fn test_extremes_are_accepted() {
        let profile = smoothed(2);
        let mut conditioner = SignalConditioner::new();

        assert_eq!(conditioner.condition(0.0, &profile), 0.0);
        assert_eq!(conditioner.condition(1.0, &profile), 0.5);
        assert_eq!(conditioner.condition(1.0, &profile), 1.0);
    }
}
