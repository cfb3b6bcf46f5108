//! In-memory world state stores.
//!
//! This module defines [`PlotWorld`] and the simple stores it bundles. They
//! implement the service traits from [`crate::services`] and are what the demo
//! binary and the test suite run against; a host game can substitute its own.

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ClockConfig, PlotlineConfig, RelationshipConfig};
use crate::services::{
    CharacterLookup, ClockService, FlagService, LocationService, RelationshipService, ServiceError, Services,
    StatService, TimePeriod,
};

/// Boolean flags keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagStore {
    flags: BTreeMap<String, bool>,
}

impl FlagStore {
    /// Iterate over every flag that has been written, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FlagService for FlagStore {
    fn get(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    fn set(&mut self, flag: &str, value: bool) {
        self.flags.insert(flag.to_string(), value);
    }
}

/// Definition of a numeric stat and its clamp policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDefinition {
    pub id: String,
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl StatDefinition {
    /// Clamp `value` into the stat's range. An inverted range is read as `max..=min`.
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min.min(self.max), self.max.max(self.min))
    }

    /// Swap an inverted `min`/`max` and pull the default into range.
    fn normalized(mut self) -> Self {
        if self.min > self.max {
            warn!("stat '{}' has min {} > max {}; swapping bounds", self.id, self.min, self.max);
            std::mem::swap(&mut self.min, &mut self.max);
        }
        let default = self.clamp(self.default);
        if default != self.default {
            warn!("stat '{}' default {} is out of range, using {default}", self.id, self.default);
            self.default = default;
        }
        self
    }
}

/// Per-character stat values. Characters start at each stat's default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatStore {
    definitions: HashMap<String, StatDefinition>,
    values: HashMap<(String, String), i32>,
}

impl StatStore {
    pub fn new(definitions: impl IntoIterator<Item = StatDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(StatDefinition::normalized)
                .map(|d| (d.id.clone(), d))
                .collect(),
            values: HashMap::new(),
        }
    }

    pub fn define(&mut self, definition: StatDefinition) {
        let definition = definition.normalized();
        self.definitions.insert(definition.id.clone(), definition);
    }

    pub fn definition(&self, stat: &str) -> Option<&StatDefinition> {
        self.definitions.get(stat)
    }

    /// All stat values for `character`, including untouched defaults, sorted by stat id.
    pub fn values_for(&self, character: &str) -> Vec<(&StatDefinition, i32)> {
        let mut out: Vec<_> = self
            .definitions
            .values()
            .map(|def| {
                let value = self
                    .values
                    .get(&(character.to_string(), def.id.clone()))
                    .copied()
                    .unwrap_or(def.default);
                (def, value)
            })
            .collect();
        out.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        out
    }
}

impl StatService for StatStore {
    fn get(&self, character: &str, stat: &str) -> Option<i32> {
        let def = self.definitions.get(stat)?;
        Some(
            self.values
                .get(&(character.to_string(), stat.to_string()))
                .copied()
                .unwrap_or(def.default),
        )
    }

    fn modify(&mut self, character: &str, stat: &str, delta: i32) -> Result<i32, ServiceError> {
        let def = self
            .definitions
            .get(stat)
            .ok_or_else(|| ServiceError::UnknownStat(stat.to_string()))?;
        let entry = self
            .values
            .entry((character.to_string(), stat.to_string()))
            .or_insert(def.default);
        *entry = def.clamp(entry.saturating_add(delta));
        Ok(*entry)
    }
}

/// Directed relationship scores, clamped to the configured range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipStore {
    scores: HashMap<(String, String), i32>,
    config: RelationshipConfig,
}

impl RelationshipStore {
    pub fn new(config: RelationshipConfig) -> Self {
        Self {
            scores: HashMap::new(),
            config,
        }
    }

    /// Score `from` holds toward `to` (zero if never changed).
    pub fn score(&self, from: &str, to: &str) -> i32 {
        self.scores
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn config(&self) -> &RelationshipConfig {
        &self.config
    }
}

impl RelationshipService for RelationshipStore {
    fn modify(&mut self, from: &str, to: &str, delta: i32) -> Result<i32, ServiceError> {
        let (min, max) = (self.config.min_score, self.config.max_score);
        let entry = self.scores.entry((from.to_string(), to.to_string())).or_insert(0);
        *entry = entry.saturating_add(delta).clamp(min, max);
        Ok(*entry)
    }

    fn score(&self, from: &str, to: &str) -> i32 {
        RelationshipStore::score(self, from, to)
    }

    fn tier_index(&self, tier: &str) -> Option<usize> {
        self.config.tier_index(tier)
    }

    fn current_tier(&self, from: &str, to: &str) -> Option<String> {
        self.config.tier_for(self.score(from, to)).map(|t| t.name.clone())
    }
}

/// Hour-and-day game clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    day: u32,
    hour: u8,
    periods: ClockConfig,
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl GameClock {
    pub fn new(periods: ClockConfig) -> Self {
        Self {
            day: periods.start_day,
            hour: periods.start_hour,
            periods,
        }
    }

    /// Jump to a specific day and hour (hours past 23 wrap into later days).
    pub fn set(&mut self, day: u32, hour: u8) {
        self.day = day.saturating_add(u32::from(hour / 24));
        self.hour = hour % 24;
    }

    /// Move the clock forward, rolling over into following days.
    pub fn advance_hours(&mut self, hours: u32) {
        let total = u32::from(self.hour) + hours % 24;
        self.day = self.day.saturating_add(hours / 24).saturating_add(total / 24);
        // total % 24 always fits in a u8
        self.hour = u8::try_from(total % 24).unwrap_or(0);
        info!("clock advanced {hours}h to day {} {:02}:00", self.day, self.hour);
    }
}

impl ClockService for GameClock {
    fn current_hour(&self) -> u8 {
        self.hour
    }

    fn current_day(&self) -> u32 {
        self.day
    }

    fn current_period(&self) -> TimePeriod {
        self.periods.period_for(self.hour)
    }
}

/// Known characters, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    names: BTreeMap<String, String>,
    player: Option<String>,
}

impl Roster {
    pub fn add(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn set_player(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.names.contains_key(&id) {
            warn!("player character '{id}' is not in the roster");
        }
        self.player = Some(id);
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }
}

impl CharacterLookup for Roster {
    fn contains(&self, character: &str) -> bool {
        self.names.contains_key(character)
    }
}

/// Tracks the player's current location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerLocation {
    current: Option<String>,
}

impl PlayerLocation {
    /// Move the player. Returns `false` if they were already there.
    pub fn move_to(&mut self, location: &str) -> bool {
        if self.current.as_deref() == Some(location) {
            return false;
        }
        self.current = Some(location.to_string());
        true
    }
}

impl LocationService for PlayerLocation {
    fn current_location(&self) -> Option<String> {
        self.current.clone()
    }
}

/// All in-memory stores the engine reads and writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotWorld {
    pub flags: FlagStore,
    pub stats: StatStore,
    pub relationships: RelationshipStore,
    pub clock: GameClock,
    pub roster: Roster,
    pub location: PlayerLocation,
}

impl PlotWorld {
    /// Create an empty world using the clock and relationship settings from `config`.
    pub fn new(config: &PlotlineConfig) -> PlotWorld {
        let world = Self {
            flags: FlagStore::default(),
            stats: StatStore::default(),
            relationships: RelationshipStore::new(config.relationships.clone()),
            clock: GameClock::new(config.clock.clone()),
            roster: Roster::default(),
            location: PlayerLocation::default(),
        };
        info!("new, empty 'PlotWorld' created");
        world
    }

    /// Borrow every store as a [`Services`] bundle.
    pub fn services(&mut self) -> Services<'_> {
        Services {
            flags: &mut self.flags,
            stats: &mut self.stats,
            relationships: &mut self.relationships,
            clock: &self.clock,
            characters: &self.roster,
        }
    }
}
