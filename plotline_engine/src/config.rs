//! Engine configuration and loader.
//!
//! Tunables that are not part of a story: the recheck safety bound, the hour
//! boundaries of each time period, and the relationship score range and tier
//! bands. Loaded from `plotline.toml`; any problem falls back to defaults.

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::TimePeriod;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotlineConfig {
    pub engine: EngineConfig,
    pub clock: ClockConfig,
    pub relationships: RelationshipConfig,
}

/// Settings for the event engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of events triggered by a single pass (one location change, evaluation or manual trigger).
    pub max_rechecks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_rechecks: 32 }
    }
}

/// Hour boundaries for each `TimePeriod`, plus the clock's starting point.
///
/// Hours before `morning_start` are `LateNight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub morning_start: u8,
    pub afternoon_start: u8,
    pub evening_start: u8,
    pub night_start: u8,
    pub start_day: u32,
    pub start_hour: u8,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            morning_start: 6,
            afternoon_start: 12,
            evening_start: 17,
            night_start: 21,
            start_day: 1,
            start_hour: 8,
        }
    }
}

impl ClockConfig {
    /// Returns the period that contains `hour`.
    pub fn period_for(&self, hour: u8) -> TimePeriod {
        if hour >= self.night_start {
            TimePeriod::Night
        } else if hour >= self.evening_start {
            TimePeriod::Evening
        } else if hour >= self.afternoon_start {
            TimePeriod::Afternoon
        } else if hour >= self.morning_start {
            TimePeriod::Morning
        } else {
            TimePeriod::LateNight
        }
    }

    fn is_ordered(&self) -> bool {
        self.morning_start < self.afternoon_start
            && self.afternoon_start < self.evening_start
            && self.evening_start < self.night_start
            && self.night_start <= 23
            && self.start_hour <= 23
    }
}

/// A named band over the relationship score, starting at `min_score`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBand {
    pub name: String,
    pub min_score: i32,
}

/// Relationship score range and tier bands (sorted lowest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    pub min_score: i32,
    pub max_score: i32,
    pub tiers: Vec<TierBand>,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            min_score: -100,
            max_score: 100,
            tiers: default_tiers(),
        }
    }
}

impl RelationshipConfig {
    /// Index of the named tier; higher index means a closer relationship.
    pub fn tier_index(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// The tier band containing `score`.
    pub fn tier_for(&self, score: i32) -> Option<&TierBand> {
        self.tiers.iter().rev().find(|t| score >= t.min_score).or(self.tiers.first())
    }
}

fn default_tiers() -> Vec<TierBand> {
    [
        ("Hostile", -100),
        ("Wary", -30),
        ("Stranger", 0),
        ("Acquaintance", 10),
        ("Friend", 30),
        ("Close Friend", 60),
        ("Confidant", 90),
    ]
    .into_iter()
    .map(|(name, min_score)| TierBand {
        name: name.to_string(),
        min_score,
    })
    .collect()
}

/// Loads configuration from a TOML file, falling back to defaults on error.
///
/// This function never fails. A missing file is expected (defaults are used
/// quietly at `info` level); an unreadable or invalid file logs a warning.
pub fn load_config(toml_path: &Path) -> PlotlineConfig {
    if !toml_path.exists() {
        info!("no config at '{}', using defaults", toml_path.display());
        return PlotlineConfig::default();
    }
    match try_load_config(toml_path) {
        Ok(config) => {
            info!(
                "config loaded from '{}' (max_rechecks = {}, {} relationship tiers)",
                toml_path.display(),
                config.engine.max_rechecks,
                config.relationships.tiers.len()
            );
            config
        },
        Err(e) => {
            warn!(
                "Could not load config from '{}': {:#}. Using defaults.",
                toml_path.display(),
                e
            );
            PlotlineConfig::default()
        },
    }
}

/// Attempts to load configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the values are inconsistent.
fn try_load_config(toml_path: &Path) -> Result<PlotlineConfig> {
    let text =
        fs::read_to_string(toml_path).with_context(|| format!("reading config from '{}'", toml_path.display()))?;
    let mut config: PlotlineConfig =
        toml::from_str(&text).with_context(|| format!("parsing config from '{}'", toml_path.display()))?;

    if config.engine.max_rechecks == 0 {
        bail!("engine.max_rechecks must be at least 1");
    }
    if !config.clock.is_ordered() {
        bail!("clock period boundaries must be ascending hours within 0-23");
    }
    if config.relationships.min_score > config.relationships.max_score {
        bail!("relationships.min_score exceeds max_score");
    }
    if config.relationships.tiers.is_empty() {
        config.relationships.tiers = default_tiers();
    }
    config.relationships.tiers.sort_by_key(|t| t.min_score);

    Ok(config)
}
