use std::path::PathBuf;
use std::str::FromStr;

use anyhow::bail;

pub const STORE_ENV: &str = "PINGPONG_STORE";
pub const DATA_PATH_ENV: &str = "PINGPONG_DATA_PATH";

/// Point-award constants used after a match concludes
#[derive(Debug, Clone, PartialEq)]
pub struct PointsSettings {
    pub singles_base: f64,
    pub doubles_base: f64,
    pub teams_base: f64,
    pub double_entity_base: f64,
    pub team_entity_base: f64,
    pub min_strength_ratio: f64,
    pub max_strength_ratio: f64,
    /// Opponent rank multipliers, Beginner through Professional
    pub rank_multipliers: [f64; 4],
    pub intermediate_threshold: u32,
    pub advanced_threshold: u32,
    pub professional_threshold: u32,
}

impl Default for PointsSettings {
    fn default() -> Self {
        Self {
            singles_base: 10.0,
            doubles_base: 8.0,
            teams_base: 6.0,
            double_entity_base: 15.0,
            team_entity_base: 20.0,
            min_strength_ratio: 0.5,
            max_strength_ratio: 2.0,
            rank_multipliers: [1.0, 1.2, 1.5, 2.0],
            intermediate_threshold: 200,
            advanced_threshold: 500,
            professional_threshold: 1000,
        }
    }
}

/// Time slots used by the tournament schedule planner
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSettings {
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    pub match_minutes: i64,
    pub break_minutes: i64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            day_start_hour: 9,
            day_end_hour: 21,
            match_minutes: 60,
            break_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Json,
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("Unknown storage backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            path: PathBuf::from("club-data"),
        }
    }
}

impl StorageSettings {
    /// Defaults overridden by `PINGPONG_STORE` / `PINGPONG_DATA_PATH` when set
    pub fn from_env() -> anyhow::Result<Self> {
        let mut settings = Self::default();
        if let Ok(backend) = std::env::var(STORE_ENV) {
            settings.backend = backend.parse()?;
        }
        if let Ok(path) = std::env::var(DATA_PATH_ENV) {
            settings.path = PathBuf::from(path);
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub points: PointsSettings,
    pub schedule: ScheduleSettings,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            storage: StorageSettings::from_env()?,
            ..Self::default()
        })
    }

    pub fn with_storage(mut self, backend: Option<StorageBackend>, path: Option<PathBuf>) -> Self {
        if let Some(backend) = backend {
            self.storage.backend = backend;
        }
        if let Some(path) = path {
            self.storage.path = path;
        }
        self
    }
}
