// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Recorded confidence traces and offline replay through the engine

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::CountingEngine;
use crate::counting::{FrameInput, TrackingSnapshot};
use crate::error::TraceError;
use crate::session::ClientId;

/// Client used for frames that do not name one
pub const DEFAULT_REPLAY_CLIENT: &str = "replay";

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub exercise: String,
    pub confidence: f64,
    pub timestamp: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl TraceFrame {
    pub fn new(exercise: &str, confidence: f64, timestamp: f64) -> Self {
        Self {
            client: None,
            exercise: exercise.to_string(),
            confidence,
            timestamp,
            visible: true,
        }
    }

    pub fn client_id(&self) -> ClientId {
        ClientId::from(self.client.as_deref().unwrap_or(DEFAULT_REPLAY_CLIENT))
    }

    pub fn input(&self) -> FrameInput {
        FrameInput::new(self.confidence, self.timestamp).with_visibility(self.visible)
    }
}

/// Read a trace, picking the parser from the file extension
pub fn read_trace(path: &Path) -> Result<Vec<TraceFrame>, TraceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parse: fn(&str) -> Result<Vec<TraceFrame>, TraceError> = match extension.as_deref() {
        Some("jsonl") | Some("json") => parse_json,
        Some("csv") => parse_csv,
        _ => return Err(TraceError::UnsupportedFormat(path.to_path_buf())),
    };

    let content = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let frames = parse(&content)?;
    info!("Read {} frames from {:?}", frames.len(), path);
    Ok(frames)
}

/// JSON lines, or a single JSON array
pub fn parse_json(content: &str) -> Result<Vec<TraceFrame>, TraceError> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).map_err(|e| TraceError::Malformed {
            line: e.line(),
            reason: e.to_string(),
        });
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| TraceError::Malformed {
                line: i + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// `timestamp,exercise,confidence,visible[,client]`, header optional
pub fn parse_csv(content: &str) -> Result<Vec<TraceFrame>, TraceError> {
    let mut frames = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (i == 0 && line.starts_with("timestamp")) {
            continue;
        }

        let malformed = |reason: String| TraceError::Malformed { line: i + 1, reason };
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 3 || fields.len() > 5 {
            return Err(malformed(format!("expected 3 to 5 columns, found {}", fields.len())));
        }

        let timestamp = fields[0]
            .parse::<f64>()
            .map_err(|e| malformed(format!("bad timestamp '{}': {}", fields[0], e)))?;
        let confidence = fields[2]
            .parse::<f64>()
            .map_err(|e| malformed(format!("bad confidence '{}': {}", fields[2], e)))?;
        let visible = match fields.get(3).copied().unwrap_or("") {
            "" | "true" | "1" => true,
            "false" | "0" => false,
            other => return Err(malformed(format!("bad visibility '{}'", other))),
        };
        let client = fields.get(4).filter(|c| !c.is_empty()).map(|c| c.to_string());

        frames.push(TraceFrame {
            client,
            exercise: fields[1].to_string(),
            confidence,
            timestamp,
            visible,
        });
    }

    Ok(frames)
}

/// Outcome of a replay
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub frames_processed: usize,
    pub repetitions_counted: u64,
    pub holds_completed: u64,
    /// Final state of every exercise touched, per client
    pub clients: BTreeMap<ClientId, Vec<TrackingSnapshot>>,
}

/// Feed frames through the engine in order.
///
/// Unseen clients are registered and a client's exercise is selected
/// whenever it differs from the previous frame's.
pub fn replay(engine: &CountingEngine, frames: &[TraceFrame]) -> ReplayReport {
    let mut report = ReplayReport::default();

    for frame in frames {
        let id = frame.client_id();
        engine.register_client(id.clone());

        if engine.selected_exercise(&id).as_deref() != Some(frame.exercise.as_str()) {
            engine.select_exercise(&id, &frame.exercise);
        }

        let Some(result) = engine.update(&id, &frame.exercise, frame.input()) else {
            debug!("Frame at {} for {} skipped", frame.timestamp, id);
            continue;
        };

        report.frames_processed += 1;
        if result.outcome.counted {
            report.repetitions_counted += 1;
        }
        if result.outcome.completed_hold.is_some() {
            report.holds_completed += 1;
        }
        report.clients.entry(id).or_default();
    }

    for (id, snapshots) in report.clients.iter_mut() {
        *snapshots = engine.snapshots(id);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines() {
        let content = r#"
{"exercise":"Plank","confidence":0.7,"timestamp":0.0}
{"exercise":"Plank","confidence":0.7,"timestamp":0.5,"visible":false,"client":"c1"}
"#;
        let frames = parse_json(content).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].visible);
        assert_eq!(frames[0].client_id().as_str(), DEFAULT_REPLAY_CLIENT);
        assert!(!frames[1].visible);
        assert_eq!(frames[1].client.as_deref(), Some("c1"));
    }

    #[test]
    fn test_parse_json_array() {
        let frames = parse_json(r#"[{"exercise":"Sit-ups","confidence":0.2,"timestamp":1.0}]"#).unwrap();
        assert_eq!(frames, vec![TraceFrame::new("Sit-ups", 0.2, 1.0)]);
    }

    #[test]
    fn test_parse_json_reports_line() {
        let err = parse_json("{\"exercise\":\"Plank\",\"confidence\":0.7,\"timestamp\":0.0}\nnot json\n").unwrap_err();
        assert!(matches!(err, TraceError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_parse_csv() {
        let content = "timestamp,exercise,confidence,visible,client\n\
                       0.0,Plank,0.7,true,a\n\
                       0.5,Plank,0.7,0\n\
                       1.0,Sit-ups,0.3\n";
        let frames = parse_csv(content).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].client.as_deref(), Some("a"));
        assert!(!frames[1].visible);
        assert!(frames[2].visible);
        assert_eq!(frames[2].exercise, "Sit-ups");

        assert!(parse_csv("0.0,Plank,high\n").is_err());
        assert!(parse_csv("0.0,Plank,0.5,maybe\n").is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_trace(Path::new("trace.txt")).unwrap_err();
        assert!(matches!(err, TraceError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_trace_from_disk() {
        let dir = std::env::temp_dir().join(format!("reptally-trace-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("trace.csv");
        std::fs::write(&path, "0.0,Push-ups,0.9\n").unwrap();

        assert_eq!(read_trace(&path).unwrap().len(), 1);
        assert!(matches!(read_trace(&dir.join("missing.csv")), Err(TraceError::Io { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_replay_switches_exercises() {
        let engine = CountingEngine::default();
        let mut frames = Vec::new();
        // Push-ups: one count after the initial cooldown
        frames.push(TraceFrame::new("Push-ups", 0.9, 2.5));
        frames.push(TraceFrame::new("Push-ups", 0.1, 3.0));
        // Plank: two seconds held, then lost
        for t in [3.0, 4.0, 5.0] {
            frames.push(TraceFrame::new("Plank", 0.8, t));
        }
        let mut lost = TraceFrame::new("Plank", 0.8, 6.0);
        lost.visible = false;
        frames.push(lost);

        let report = replay(&engine, &frames);

        assert_eq!(report.frames_processed, 6);
        assert_eq!(report.repetitions_counted, 1);
        assert_eq!(report.holds_completed, 1);

        let snapshots = &report.clients[&ClientId::from(DEFAULT_REPLAY_CLIENT)];
        assert_eq!(snapshots.len(), 2);
        let plank = snapshots.iter().find(|s| s.exercise == "Plank").unwrap();
        assert!((plank.hold_best - 2.0).abs() < 1e-9);
        assert_eq!(engine.selected_exercise(&ClientId::from(DEFAULT_REPLAY_CLIENT)).as_deref(), Some("Plank"));
    }

    #[test]
    fn test_replay_keeps_clients_apart() {
        let engine = CountingEngine::default();
        let mut a = TraceFrame::new("Push-ups", 0.9, 2.5);
        a.client = Some("a".to_string());
        let mut b = TraceFrame::new("Push-ups", 0.1, 2.5);
        b.client = Some("b".to_string());

        let report = replay(&engine, &[a, b]);
        assert_eq!(report.clients.len(), 2);
        assert_eq!(report.clients[&ClientId::from("a")][0].repetition_count, 1);
        assert_eq!(report.clients[&ClientId::from("b")][0].repetition_count, 0);
    }
}
