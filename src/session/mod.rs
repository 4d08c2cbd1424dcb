// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Session record store - per-client map of per-exercise tracking state
//!
//! The top-level map is shared by every connection and guarded by a
//! read/write lock. Each client record has its own mutex; frames for one
//! client are applied by a single task, so that mutex is never contended by
//! updates and only serialises them against stats readers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::counting::ExerciseTrackingState;

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Everything tracked for one connected client
#[derive(Debug)]
pub struct ClientSession {
    id: ClientId,
    started_at: DateTime<Utc>,
    selected: Option<String>,
    last_update: Option<f64>,
    exercises: HashMap<String, ExerciseTrackingState>,
}

impl ClientSession {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            selected: None,
            last_update: None,
            exercises: HashMap::new(),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Currently selected exercise
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Make `exercise` the current selection.
    ///
    /// The first selection of an exercise creates zeroed state. Selecting it
    /// again keeps its counters and only re-arms latch and twist direction.
    /// Returns true when state was created.
    pub fn select(&mut self, exercise: &str) -> bool {
        self.selected = Some(exercise.to_string());

        match self.exercises.get_mut(exercise) {
            Some(state) => {
                state.rearm();
                false
            }
            None => {
                self.exercises.insert(exercise.to_string(), ExerciseTrackingState::new());
                true
            }
        }
    }

    pub fn get_or_create(&mut self, exercise: &str) -> &mut ExerciseTrackingState {
        self.exercises.entry(exercise.to_string()).or_default()
    }

    pub fn get(&self, exercise: &str) -> Option<&ExerciseTrackingState> {
        self.exercises.get(exercise)
    }

    pub fn get_mut(&mut self, exercise: &str) -> Option<&mut ExerciseTrackingState> {
        self.exercises.get_mut(exercise)
    }

    /// Re-zero one exercise, leaving the others alone
    pub fn reset(&mut self, exercise: &str) {
        self.exercises.insert(exercise.to_string(), ExerciseTrackingState::new());
    }

    /// Seconds since the previous update of this client, then record `now`.
    ///
    /// The first update yields 0. Backwards steps yield 0.
    pub fn advance_clock(&mut self, now: f64) -> f64 {
        let dt = match self.last_update {
            Some(previous) => (now - previous).max(0.0),
            None => 0.0,
        };
        self.last_update = Some(now);
        dt
    }

    pub fn last_update(&self) -> Option<f64> {
        self.last_update
    }

    pub fn exercises(&self) -> impl Iterator<Item = (&str, &ExerciseTrackingState)> {
        self.exercises.iter().map(|(name, state)| (name.as_str(), state))
    }

    pub fn total_repetitions(&self) -> u64 {
        self.exercises.values().map(|s| s.repetition_count()).sum()
    }

    pub fn summary(&self, ended_at: DateTime<Utc>) -> SessionSummary {
        let mut exercises: Vec<ExerciseSummary> = self.exercises.iter()
            .map(|(name, state)| ExerciseSummary {
                exercise: name.clone(),
                repetitions: state.repetition_count(),
                best_hold: state.hold_best().max(state.hold_current()),
            })
            .collect();
        exercises.sort_by(|a, b| a.exercise.cmp(&b.exercise));

        SessionSummary {
            client_id: self.id.clone(),
            started_at: self.started_at,
            ended_at,
            exercises,
        }
    }
}

/// Final per-exercise result of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub exercise: String,
    pub repetitions: u64,
    pub best_hold: f64,
}

/// What a client achieved during one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub client_id: ClientId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub exercises: Vec<ExerciseSummary>,
}

impl SessionSummary {
    pub fn total_repetitions(&self) -> u64 {
        self.exercises.iter().map(|e| e.repetitions).sum()
    }
}

/// Concurrency-safe map of client sessions
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ClientId, Arc<Mutex<ClientSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty session. Returns false if the client already exists.
    pub fn register(&self, id: ClientId) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(id.clone(), Arc::new(Mutex::new(ClientSession::new(id))));
        true
    }

    /// Drop all state of a client
    pub fn remove(&self, id: &ClientId) -> Option<Arc<Mutex<ClientSession>>> {
        self.sessions.write().remove(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.sessions.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `f` against one client's session, `None` for unknown clients.
    ///
    /// The map lock is released before the session lock is taken.
    pub fn with_session<R>(&self, id: &ClientId, f: impl FnOnce(&mut ClientSession) -> R) -> Option<R> {
        let session = self.sessions.read().get(id).cloned()?;
        let mut session = session.lock();
        Some(f(&mut session))
    }

    /// Run `f` against an exercise's state, creating it on first access
    pub fn get_or_create<R>(
        &self,
        id: &ClientId,
        exercise: &str,
        f: impl FnOnce(&mut ExerciseTrackingState) -> R,
    ) -> Option<R> {
        self.with_session(id, |session| f(session.get_or_create(exercise)))
    }

    /// Re-zero one exercise of one client. False for unknown clients.
    pub fn reset(&self, id: &ClientId, exercise: &str) -> bool {
        self.with_session(id, |session| session.reset(exercise)).is_some()
    }

    /// Visit every session under its own lock
    pub fn for_each(&self, mut f: impl FnMut(&ClientSession)) {
        let sessions: Vec<Arc<Mutex<ClientSession>>> = self.sessions.read().values().cloned().collect();
        for session in sessions {
            f(&session.lock());
        }
    }
}
