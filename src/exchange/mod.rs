use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{Double, Player, Team};
use crate::matches::Match;
use crate::rules::Rule;
use crate::tournament::Tournament;

pub const EXPORT_VERSION: &str = "1.0";
pub const APP_NAME: &str = "Ping Pong Tournament Manager";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub app_name: String,
    pub total_records: usize,
}

/// Whole-club snapshot. Collections missing from an imported file are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub export_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExportMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Player>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubles: Option<Vec<Double>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Team>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournaments: Option<Vec<Tournament>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<Match>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
}

impl ExportBundle {
    pub fn new(
        players: Vec<Player>,
        doubles: Vec<Double>,
        teams: Vec<Team>,
        tournaments: Vec<Tournament>,
        matches: Vec<Match>,
        rules: Vec<Rule>,
        now: DateTime<Utc>,
    ) -> Self {
        let total_records =
            players.len() + doubles.len() + teams.len() + tournaments.len() + matches.len() + rules.len();
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: now,
            metadata: Some(ExportMetadata {
                app_name: APP_NAME.to_string(),
                total_records,
            }),
            players: Some(players),
            doubles: Some(doubles),
            teams: Some(teams),
            tournaments: Some(tournaments),
            matches: Some(matches),
            rules: Some(rules),
        }
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let bundle: Self = read_json(path)?;
        if bundle.version != EXPORT_VERSION {
            warn!("Importing bundle version {}, expected {}", bundle.version, EXPORT_VERSION);
        }
        Ok(bundle)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Rule book on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBook {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub rules: Vec<Rule>,
}

impl RuleBook {
    pub fn new(rules: Vec<Rule>, now: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: now,
            rules,
        }
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Per-collection outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResults {
    pub imported: BTreeMap<String, usize>,
    pub errors: BTreeMap<String, String>,
}

impl ImportResults {
    pub fn record<E: std::fmt::Display>(&mut self, collection: &str, outcome: std::result::Result<usize, E>) {
        match outcome {
            Ok(count) => {
                self.imported.insert(collection.to_string(), count);
            }
            Err(err) => {
                warn!("Import of {} rejected: {}", collection, err);
                self.errors.insert(collection.to_string(), err.to_string());
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&json).with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
    info!("Read {}", path.display());
    Ok(value)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create export directory")?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize export")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}
