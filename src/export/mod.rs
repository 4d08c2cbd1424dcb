// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Count event export to JSON lines or CSV

use anyhow::{anyhow, Result};
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ExportFormat;
use crate::core::{CountEvent, CountEventKind};

const CSV_HEADER: &str = "recorded_at,id,client_id,exercise,kind,timestamp,count,duration,best";

/// Appends count events to a per-day file
pub struct EventExporter {
    path: PathBuf,
    format: ExportFormat,
    events_file: Mutex<Option<BufWriter<File>>>,
    events_count: Mutex<usize>,
}

impl EventExporter {
    pub fn new(path: impl AsRef<Path>, format: ExportFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            format,
            events_file: Mutex::new(None),
            events_count: Mutex::new(0),
        })
    }

    /// Export a count event
    pub fn export(&self, event: &CountEvent) -> Result<()> {
        let mut file_lock = self.events_file.lock();

        if file_lock.is_none() {
            let filename = self.events_filename();
            let is_new = !filename.exists();
            let mut writer = BufWriter::new(self.open_export_file(&filename)?);

            if self.format == ExportFormat::Csv && is_new {
                writeln!(writer, "{}", CSV_HEADER)?;
            }
            info!("Exporting events to {:?}", filename);
            *file_lock = Some(writer);
        }

        if let Some(ref mut writer) = *file_lock {
            match self.format {
                ExportFormat::Json => {
                    let json = serde_json::to_string(event)?;
                    writeln!(writer, "{}", json)?;
                }
                ExportFormat::Csv => {
                    writeln!(writer, "{}", csv_row(event))?;
                }
            }
        }

        *self.events_count.lock() += 1;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = *self.events_file.lock() {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn exported_count(&self) -> usize {
        *self.events_count.lock()
    }

    /// File the exporter is currently writing to
    pub fn events_filename(&self) -> PathBuf {
        let date = Utc::now().format("%Y%m%d");
        let ext = match self.format {
            ExportFormat::Json => "jsonl",
            ExportFormat::Csv => "csv",
        };
        self.path.join(format!("events_{}.{}", date, ext))
    }

    /// Flush and close the file
    pub fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.events_file.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn open_export_file(&self, path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow!("Failed to open export file: {}", e))
    }
}

fn csv_row(event: &CountEvent) -> String {
    let (count, duration, best) = match event.kind {
        CountEventKind::Repetition { count } => (count.to_string(), String::new(), String::new()),
        CountEventKind::HoldCompleted { duration, best } => {
            (String::new(), format!("{:.3}", duration), format!("{:.3}", best))
        }
        CountEventKind::ExerciseSelected | CountEventKind::ClientRemoved => {
            (String::new(), String::new(), String::new())
        }
    };

    format!(
        "{},{},{},{},{},{},{},{},{}",
        event.recorded_at.to_rfc3339(),
        event.id,
        csv_field(event.client_id.as_str()),
        csv_field(event.exercise.as_deref().unwrap_or("")),
        event.kind.name(),
        event.timestamp.map(|t| format!("{:.3}", t)).unwrap_or_default(),
        count,
        duration,
        best,
    )
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
