// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Session history - finished sessions persisted to SQLite

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::session::{ClientId, ExerciseSummary, SessionSummary};

/// A persisted session and its row id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: String,
    pub summary: SessionSummary,
}

/// Totals for one exercise across every stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTotals {
    pub exercise: String,
    pub sessions: u64,
    pub repetitions: u64,
    pub best_hold: f64,
}

/// SQLite-backed session history
pub struct SessionHistory {
    conn: Arc<Mutex<Connection>>,
}

impl SessionHistory {
    /// Open or create the history database
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;
        conn.execute_batch(r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        "#)?;

        let history = Self::from_connection(conn)?;
        info!("Session history opened at {:?}", config.path);
        Ok(history)
    }

    /// Throwaway history, used by tests and `--no-history` runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let history = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        history.create_tables()?;
        Ok(history)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                total_repetitions INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_ended ON sessions(ended_at);

            CREATE TABLE IF NOT EXISTS session_exercises (
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                exercise TEXT NOT NULL,
                repetitions INTEGER NOT NULL,
                best_hold REAL NOT NULL,
                PRIMARY KEY (session_id, exercise)
            );

            CREATE INDEX IF NOT EXISTS idx_session_exercises_name ON session_exercises(exercise);
        "#)?;

        Ok(())
    }

    /// Store a finished session, returning its id
    pub fn record_session(&self, summary: &SessionSummary) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO sessions (id, client_id, started_at, ended_at, total_repetitions)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                summary.client_id.as_str(),
                summary.started_at.to_rfc3339(),
                summary.ended_at.to_rfc3339(),
                summary.total_repetitions() as i64,
            ],
        )?;

        for exercise in &summary.exercises {
            tx.execute(
                "INSERT INTO session_exercises (session_id, exercise, repetitions, best_hold)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, exercise.exercise, exercise.repetitions as i64, exercise.best_hold],
            )?;
        }

        tx.commit()?;
        debug!("Recorded session {} for {}", id, summary.client_id);
        Ok(id)
    }

    pub fn load_session(&self, id: &str) -> Result<Option<SessionSummary>> {
        let conn = self.conn.lock();

        let row = conn
            .query_row(
                "SELECT client_id, started_at, ended_at FROM sessions WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        let Some((client_id, started_at, ended_at)) = row else {
            return Ok(None);
        };

        let exercises = load_exercises(&conn, id)?;
        Ok(Some(SessionSummary {
            client_id: ClientId::from(client_id),
            started_at: parse_time(&started_at)?,
            ended_at: parse_time(&ended_at)?,
            exercises,
        }))
    }

    /// Most recently finished sessions first
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<StoredSession>> {
        let ids: Vec<String> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id FROM sessions ORDER BY ended_at DESC, rowid DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| row.get(0))?;
            let ids = rows.collect::<rusqlite::Result<Vec<String>>>()?;
            ids
        };

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(summary) = self.load_session(&id)? {
                sessions.push(StoredSession { id, summary });
            }
        }
        Ok(sessions)
    }

    pub fn exercise_totals(&self, exercise: &str) -> Result<ExerciseTotals> {
        let conn = self.conn.lock();

        let (sessions, repetitions, best_hold) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(repetitions), 0), COALESCE(MAX(best_hold), 0.0)
             FROM session_exercises WHERE exercise = ?1",
            params![exercise],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?)),
        )?;

        Ok(ExerciseTotals {
            exercise: exercise.to_string(),
            sessions: sessions.max(0) as u64,
            repetitions: repetitions.max(0) as u64,
            best_hold,
        })
    }

    pub fn session_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn load_exercises(conn: &Connection, session_id: &str) -> Result<Vec<ExerciseSummary>> {
    let mut stmt = conn.prepare(
        "SELECT exercise, repetitions, best_hold FROM session_exercises
         WHERE session_id = ?1 ORDER BY exercise",
    )?;

    let rows = stmt.query_map(params![session_id], |row| {
        Ok(ExerciseSummary {
            exercise: row.get(0)?,
            repetitions: row.get::<_, i64>(1)?.max(0) as u64,
            best_hold: row.get(2)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid timestamp '{}' in history: {}", value, e))
}
