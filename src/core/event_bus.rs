// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Event bus for counting events

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::session::ClientId;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CountEventKind {
    Repetition { count: u64 },
    HoldCompleted { duration: f64, best: f64 },
    ExerciseSelected,
    ClientRemoved,
}

impl CountEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            CountEventKind::Repetition { .. } => "repetition",
            CountEventKind::HoldCompleted { .. } => "hold_completed",
            CountEventKind::ExerciseSelected => "exercise_selected",
            CountEventKind::ClientRemoved => "client_removed",
        }
    }
}

/// Event published by the counting engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEvent {
    pub id: u64,
    pub client_id: ClientId,
    pub exercise: Option<String>,
    pub kind: CountEventKind,
    /// Caller clock of the frame that produced the event
    pub timestamp: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Broadcast channel for count events
pub struct EventBus {
    event_tx: broadcast::Sender<CountEvent>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(
        &self,
        client_id: &ClientId,
        exercise: Option<&str>,
        kind: CountEventKind,
        timestamp: Option<f64>,
    ) -> u64 {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = CountEvent {
            id,
            client_id: client_id.clone(),
            exercise: exercise.map(str::to_string),
            kind,
            timestamp,
            recorded_at: Utc::now(),
        };
        let _ = self.event_tx.send(event);
        id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CountEvent> {
        self.event_tx.subscribe()
    }

    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
