// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::counting::{HoldConstants, HOLD_THRESHOLD, MIN_HOLD_DURATION};
use crate::profiles::{ExerciseProfile, ProfileTable};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Counting engine configuration
    pub engine: EngineConfig,

    /// Event export configuration
    pub export: ExportConfig,

    /// Session history configuration
    pub database: DatabaseConfig,

    /// Demo simulation configuration
    pub simulation: SimulationConfig,

    /// Per-exercise profile overrides, merged over the built-in table
    pub profiles: HashMap<String, ExerciseProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "RepTally".to_string(),
            data_dir: PathBuf::from("./data"),
            engine: EngineConfig::default(),
            export: ExportConfig::default(),
            database: DatabaseConfig::default(),
            simulation: SimulationConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("reptally"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Built-in profiles with the configured overrides applied
    pub fn profile_table(&self) -> Result<ProfileTable> {
        let table = ProfileTable::builtin().with_overrides(&self.profiles)?;
        if !self.profiles.is_empty() {
            info!("Applied {} profile overrides", self.profiles.len());
        }
        Ok(table)
    }
}

/// Counting engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Confidence above which a hold pose counts as held
    pub hold_threshold: f64,

    /// Shortest hold, in seconds, that is committed to the best time
    pub min_hold_duration: f64,

    /// Buffered events per event bus subscriber
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_threshold: HOLD_THRESHOLD,
            min_hold_duration: MIN_HOLD_DURATION,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn hold_constants(&self) -> HoldConstants {
        HoldConstants {
            hold_threshold: self.hold_threshold,
            min_hold_duration: self.min_hold_duration,
        }
    }
}

/// Event export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Write count events to disk
    pub enabled: bool,

    /// Output format
    pub format: ExportFormat,

    /// Output directory
    pub path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            format: ExportFormat::Json,
            path: PathBuf::from("./data/events"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Session history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Enable database storage
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/reptally.db"),
        }
    }
}

/// Demo simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated clients
    pub clients: usize,

    /// Length of each simulated session
    pub duration_secs: f64,

    /// Frames per second sent by each client
    pub fps: f64,

    /// RNG seed, random when unset
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clients: 3,
            duration_secs: 30.0,
            fps: 15.0,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::CountingMode;

    #[test]
    fn test_default_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.engine.hold_threshold, HOLD_THRESHOLD);
        assert_eq!(parsed.export.format, ExportFormat::Json);
        assert_eq!(parsed.simulation.clients, 3);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            hold_threshold = 0.6

            [profiles."Jumping Jacks"]
            high_threshold = 0.6
            low_threshold = 0.3
            cooldown_seconds = 0.5

            [profiles."Jumping Jacks".mode]
            kind = "on_peak"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.hold_constants().hold_threshold, 0.6);
        assert_eq!(config.engine.min_hold_duration, MIN_HOLD_DURATION);

        let table = config.profile_table().unwrap();
        assert!(table.contains("Jumping Jacks"));
        assert!(table.contains("Plank"));
        assert_eq!(table.lookup("Jumping Jacks").mode, CountingMode::OnPeak);
        assert_eq!(table.lookup("Jumping Jacks").smoothing_window, 2);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = Config::default();
        config.profiles.insert(
            "Bad".to_string(),
            ExerciseProfile::new(0.2, 0.8, CountingMode::PeakToLow, 1.0),
        );
        assert!(config.profile_table().is_err());
    }

    #[test]
    fn test_load_or_create() {
        let dir = std::env::temp_dir().join(format!("reptally-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.app_name, created.app_name);

        std::fs::remove_dir_all(&dir).ok();
    }
}
