//! External collaborator interfaces.
//!
//! The engine never owns world state beyond its completion set. Flags, stats,
//! relationships, the clock and the character roster are reached through the
//! traits below, bundled into [`Services`] and handed to every evaluate/apply
//! call. Simple in-memory implementations live in [`crate::world`].

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use variantly::Variantly;

use crate::dialogue::{AvailableChoice, DialogueNode};

/// Named parts of the in-game day.
#[derive(Copy, Clone, Debug, Variantly, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    LateNight,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimePeriod::LateNight => write!(f, "Late Night"),
            TimePeriod::Morning => write!(f, "Morning"),
            TimePeriod::Afternoon => write!(f, "Afternoon"),
            TimePeriod::Evening => write!(f, "Evening"),
            TimePeriod::Night => write!(f, "Night"),
        }
    }
}

/// Errors reported by service implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("unknown character '{0}'")]
    UnknownCharacter(String),
    #[error("unknown stat '{0}'")]
    UnknownStat(String),
}

/// Renders dialogue. Implementations decide how text and choices reach the player.
///
/// Choice selection flows back through `EventEngine::choose` (or
/// `DialogueRunner::select_choice`) using the `index` of an [`AvailableChoice`].
pub trait Presenter {
    fn present_node(&mut self, node: &DialogueNode);
    fn show_choices(&mut self, choices: &[AvailableChoice<'_>]);
    fn hide_choices(&mut self);
    fn on_dialogue_end(&mut self);
}

/// Reports where the player currently is.
pub trait LocationService {
    fn current_location(&self) -> Option<String>;
}

/// Boolean story flags. Unknown flags read as `false`.
pub trait FlagService {
    fn get(&self, flag: &str) -> bool;
    fn set(&mut self, flag: &str, value: bool);
}

/// Numeric per-character stats.
pub trait StatService {
    /// Current value, or `None` if the stat is not defined.
    fn get(&self, character: &str, stat: &str) -> Option<i32>;
    /// Apply `delta` under the stat's clamp policy and return the new value.
    ///
    /// # Errors
    /// - if the stat is not defined
    fn modify(&mut self, character: &str, stat: &str, delta: i32) -> Result<i32, ServiceError>;
}

/// Directed relationship scores between characters, grouped into named tiers.
pub trait RelationshipService {
    /// Apply `delta` to the score `from` holds toward `to`; returns the new score.
    ///
    /// # Errors
    /// - if the implementation rejects either character
    fn modify(&mut self, from: &str, to: &str, delta: i32) -> Result<i32, ServiceError>;
    /// Score `from` currently holds toward `to`.
    fn score(&self, from: &str, to: &str) -> i32;
    fn tier_index(&self, tier: &str) -> Option<usize>;
    fn current_tier(&self, from: &str, to: &str) -> Option<String>;
}

/// In-game time.
pub trait ClockService {
    fn current_hour(&self) -> u8;
    fn current_day(&self) -> u32;
    fn current_period(&self) -> TimePeriod;
}

/// Resolves character references.
pub trait CharacterLookup {
    fn contains(&self, character: &str) -> bool;
}

/// Handles passed into condition evaluation and consequence application.
pub struct Services<'a> {
    pub flags: &'a mut dyn FlagService,
    pub stats: &'a mut dyn StatService,
    pub relationships: &'a mut dyn RelationshipService,
    pub clock: &'a dyn ClockService,
    pub characters: &'a dyn CharacterLookup,
}

impl Services<'_> {
    /// Current tier index of `from` toward `to`, if both the tier and the characters resolve.
    pub fn current_tier_index(&self, from: &str, to: &str) -> Option<usize> {
        let tier = self.relationships.current_tier(from, to)?;
        self.relationships.tier_index(&tier)
    }
}
