// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Counting engine - single entry point for select, update, reset and removal

use std::sync::Arc;
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

use super::event_bus::{CountEventKind, EventBus};
use super::EngineStats;
use crate::config::Config;
use crate::counting::{FrameInput, HoldConstants, TrackingSnapshot, UpdateOutcome};
use crate::profiles::ProfileTable;
use crate::session::{ClientId, SessionStore, SessionSummary};

/// Result of applying one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub outcome: UpdateOutcome,
    pub snapshot: TrackingSnapshot,
}

/// Repetition and hold-time counting engine
pub struct CountingEngine {
    profiles: ProfileTable,
    constants: HoldConstants,
    store: SessionStore,
    event_bus: Option<Arc<EventBus>>,
}

impl CountingEngine {
    pub fn new(profiles: ProfileTable, constants: HoldConstants) -> Self {
        Self {
            profiles,
            constants,
            store: SessionStore::new(),
            event_bus: None,
        }
    }

    /// Engine with validated profile overrides and hold constants from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let profiles = config.profile_table()?;
        info!("Loaded {} exercise profiles", profiles.len());
        Ok(Self::new(profiles, config.engine.hold_constants()))
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    pub fn constants(&self) -> &HoldConstants {
        &self.constants
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    pub fn register_client(&self, id: ClientId) -> bool {
        let created = self.store.register(id.clone());
        if created {
            info!("Client registered: {}", id);
        }
        created
    }

    /// Drop a client and return what it achieved
    pub fn remove_client(&self, id: &ClientId) -> Option<SessionSummary> {
        let session = self.store.remove(id)?;
        let summary = session.lock().summary(Utc::now());

        info!("Client removed: {} ({} reps)", id, summary.total_repetitions());
        self.publish(id, None, CountEventKind::ClientRemoved, None);
        Some(summary)
    }

    /// Select an exercise for a client. False for unknown clients.
    pub fn select_exercise(&self, id: &ClientId, exercise: &str) -> bool {
        let Some(created) = self.store.with_session(id, |session| session.select(exercise)) else {
            return false;
        };

        if !self.profiles.contains(exercise) {
            debug!("'{}' has no profile, counting with defaults", exercise);
        }
        info!("Client {} selected {} ({})", id, exercise, if created { "new" } else { "resumed" });
        self.publish(id, Some(exercise), CountEventKind::ExerciseSelected, None);
        true
    }

    /// Re-zero one exercise of a client. False for unknown clients.
    pub fn reset_exercise(&self, id: &ClientId, exercise: &str) -> bool {
        let reset = self.store.reset(id, exercise);
        if reset {
            info!("Client {} reset {}", id, exercise);
        }
        reset
    }

    /// Apply one frame to one exercise.
    ///
    /// `None` when the client is unknown or has never selected the exercise.
    pub fn update(&self, id: &ClientId, exercise: &str, frame: FrameInput) -> Option<FrameResult> {
        let profile = self.profiles.lookup(exercise);

        let result = self.store.with_session(id, |session| {
            session.get(exercise)?;
            let dt = session.advance_clock(frame.timestamp);
            let state = session.get_mut(exercise)?;
            let outcome = state.apply(profile, &self.constants, &frame, dt);
            Some(FrameResult {
                outcome,
                snapshot: state.snapshot(exercise, profile),
            })
        })??;

        if result.outcome.counted {
            debug!("{} {}: repetition #{}", id, exercise, result.snapshot.repetition_count);
            self.publish(
                id,
                Some(exercise),
                CountEventKind::Repetition { count: result.snapshot.repetition_count },
                Some(frame.timestamp),
            );
        }
        if let Some(duration) = result.outcome.completed_hold {
            debug!("{} {}: hold of {:.2}s", id, exercise, duration);
            self.publish(
                id,
                Some(exercise),
                CountEventKind::HoldCompleted { duration, best: result.snapshot.hold_best },
                Some(frame.timestamp),
            );
        }

        Some(result)
    }

    /// Apply one frame to the client's currently selected exercise
    pub fn update_selected(&self, id: &ClientId, frame: FrameInput) -> Option<FrameResult> {
        let exercise = self.selected_exercise(id)?;
        self.update(id, &exercise, frame)
    }

    pub fn selected_exercise(&self, id: &ClientId) -> Option<String> {
        self.store.with_session(id, |session| session.selected().map(str::to_string))?
    }

    pub fn snapshot(&self, id: &ClientId, exercise: &str) -> Option<TrackingSnapshot> {
        let profile = self.profiles.lookup(exercise);
        self.store
            .with_session(id, |session| session.get(exercise).map(|s| s.snapshot(exercise, profile)))?
    }

    /// Snapshots of every exercise a client has touched, sorted by name
    pub fn snapshots(&self, id: &ClientId) -> Vec<TrackingSnapshot> {
        let mut snapshots = self.store
            .with_session(id, |session| {
                session.exercises()
                    .map(|(name, state)| state.snapshot(name, self.profiles.lookup(name)))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        snapshots.sort_by(|a, b| a.exercise.cmp(&b.exercise));
        snapshots
    }

    pub fn stats(&self) -> EngineStats {
        let mut stats = EngineStats::default();

        self.store.for_each(|session| {
            stats.active_clients += 1;
            stats.total_repetitions += session.total_repetitions();
            stats.total_best_hold += session.exercises().map(|(_, s)| s.hold_best()).sum::<f64>();
            if let Some(selected) = session.selected() {
                stats.exercises_in_use.push(selected.to_string());
            }
        });

        stats.exercises_in_use.sort();
        stats.exercises_in_use.dedup();
        stats
    }

    fn publish(&self, id: &ClientId, exercise: Option<&str>, kind: CountEventKind, timestamp: Option<f64>) {
        if let Some(bus) = &self.event_bus {
            bus.publish(id, exercise, kind, timestamp);
        }
    }
}

impl Default for CountingEngine {
    fn default() -> Self {
        Self::new(ProfileTable::builtin(), HoldConstants::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::Phase;

    fn engine_with_client(id: &str) -> (CountingEngine, ClientId) {
        let engine = CountingEngine::default();
        let id = ClientId::from(id);
        engine.register_client(id.clone());
        (engine, id)
    }

    #[test]
    fn test_unknown_client_and_unselected_exercise() {
        let (engine, id) = engine_with_client("a");

        assert!(engine.update(&ClientId::from("ghost"), "Plank", FrameInput::new(0.9, 1.0)).is_none());
        assert!(engine.update(&id, "Plank", FrameInput::new(0.9, 1.0)).is_none());
        assert!(engine.update_selected(&id, FrameInput::new(0.9, 1.0)).is_none());
        assert!(!engine.select_exercise(&ClientId::from("ghost"), "Plank"));
    }

    #[test]
    fn test_squat_counts_through_engine() {
        let (engine, id) = engine_with_client("a");
        engine.select_exercise(&id, "Bodyweight Squat");

        // Two-frame smoothing: the signal has to stay up long enough
        let frames = [(0.1, 0.0), (0.8, 0.1), (0.8, 0.2), (0.1, 0.9), (0.1, 1.0)];
        let mut counted = 0;
        for (c, t) in frames {
            let result = engine.update_selected(&id, FrameInput::new(c, t)).unwrap();
            if result.outcome.counted {
                counted += 1;
            }
        }

        assert_eq!(counted, 1);
        let snap = engine.snapshot(&id, "Bodyweight Squat").unwrap();
        assert_eq!(snap.repetition_count, 1);
        assert_eq!(snap.phase, Phase::Low);
    }

    #[test]
    fn test_plank_through_engine() {
        let (engine, id) = engine_with_client("a");
        engine.select_exercise(&id, "Plank");

        for t in [0.0, 1.0, 2.0] {
            engine.update(&id, "Plank", FrameInput::new(0.7, t));
        }
        let snap = engine.snapshot(&id, "Plank").unwrap();
        assert!((snap.hold_current - 2.0).abs() < 1e-12);

        let result = engine.update(&id, "Plank", FrameInput::new(0.7, 3.0).with_visibility(false)).unwrap();
        assert_eq!(result.outcome.completed_hold, Some(2.0));
        assert_eq!(result.snapshot.hold_best, 2.0);
        assert_eq!(result.snapshot.hold_current, 0.0);
    }

    #[test]
    fn test_reselect_keeps_other_counters() {
        let (engine, id) = engine_with_client("a");
        engine.select_exercise(&id, "Lying Leg Raises");
        engine.update_selected(&id, FrameInput::new(0.9, 2.0));
        assert!(engine.snapshot(&id, "Lying Leg Raises").unwrap().latched);

        engine.select_exercise(&id, "Plank");
        engine.select_exercise(&id, "Lying Leg Raises");

        let snap = engine.snapshot(&id, "Lying Leg Raises").unwrap();
        assert_eq!(snap.repetition_count, 1);
        assert!(!snap.latched);
        assert_eq!(engine.snapshots(&id).len(), 2);
    }

    #[test]
    fn test_unknown_exercise_uses_default_profile() {
        let (engine, id) = engine_with_client("a");
        engine.select_exercise(&id, "Mountain Climbers");

        let result = engine.update_selected(&id, FrameInput::new(0.2, 0.0)).unwrap();
        assert_eq!(result.snapshot.mode, "peak_to_low");
    }

    #[test]
    fn test_events_published() {
        let bus = Arc::new(EventBus::new(32));
        let mut rx = bus.subscribe();
        let engine = CountingEngine::default().with_event_bus(bus.clone());
        let id = ClientId::from("a");
        engine.register_client(id.clone());

        engine.select_exercise(&id, "Push-ups");
        engine.update_selected(&id, FrameInput::new(0.9, 2.5));
        engine.remove_client(&id);

        let kinds: Vec<CountEventKind> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CountEventKind::ExerciseSelected,
                CountEventKind::Repetition { count: 1 },
                CountEventKind::ClientRemoved,
            ]
        );
    }

    #[test]
    fn test_stats_and_removal() {
        let engine = CountingEngine::default();
        for name in ["a", "b"] {
            let id = ClientId::from(name);
            engine.register_client(id.clone());
            engine.select_exercise(&id, "Push-ups");
            engine.update_selected(&id, FrameInput::new(0.9, 3.0));
        }

        let stats = engine.stats();
        assert_eq!(stats.active_clients, 2);
        assert_eq!(stats.total_repetitions, 2);
        assert_eq!(stats.exercises_in_use, vec!["Push-ups".to_string()]);

        let summary = engine.remove_client(&ClientId::from("a")).unwrap();
        assert_eq!(summary.total_repetitions(), 1);
        assert!(engine.remove_client(&ClientId::from("a")).is_none());
        assert_eq!(engine.stats().active_clients, 1);
    }

    #[test]
    fn test_reset_exercise() {
        let (engine, id) = engine_with_client("a");
        engine.select_exercise(&id, "Push-ups");
        engine.update_selected(&id, FrameInput::new(0.9, 3.0));

        assert!(engine.reset_exercise(&id, "Push-ups"));
        assert_eq!(engine.snapshot(&id, "Push-ups").unwrap().repetition_count, 0);
        assert!(!engine.reset_exercise(&ClientId::from("ghost"), "Push-ups"));
    }
}
