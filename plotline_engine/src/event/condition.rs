//! condition.rs -- event `Condition` module
//!
//! Predicates over world state that gate whether an event is eligible. Every
//! variant reads only the [`Services`] handed to it.

use std::fmt::Display;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::services::{Services, TimePeriod};

/// Comparison operators for stat checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

impl Comparison {
    pub fn compare(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Comparison::Less => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::Greater => lhs > rhs,
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Greater => ">",
        };
        write!(f, "{op}")
    }
}

/// World-state checks an event can require.
///
/// `None` in a reference field means the reference was never assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    FlagEquals {
        flag: Option<String>,
        value: bool,
    },
    StatCompare {
        character: Option<String>,
        stat: Option<String>,
        op: Comparison,
        value: i32,
    },
    /// `start_hour <= hour < end_hour`, wrapping past midnight when `start_hour > end_hour`.
    TimeWindow {
        start_hour: u8,
        end_hour: u8,
    },
    TimePeriodEquals(TimePeriod),
    DayAtLeast(u32),
    RelationshipTierAtLeast {
        from: Option<String>,
        to: Option<String>,
        tier: Option<String>,
    },
}

impl ConditionKind {
    /// Raw check before negation. Returns `None` when a reference cannot be resolved.
    pub fn check(&self, services: &Services<'_>) -> Option<bool> {
        match self {
            Self::FlagEquals { flag, value } => {
                let flag = required(flag.as_deref(), "FlagEquals", "flag")?;
                Some(services.flags.get(flag) == *value)
            },
            Self::StatCompare {
                character,
                stat,
                op,
                value,
            } => {
                let character = known_character(services, character.as_deref(), "StatCompare")?;
                let stat = required(stat.as_deref(), "StatCompare", "stat")?;
                let Some(current) = services.stats.get(character, stat) else {
                    warn!("StatCompare: stat '{stat}' is not defined");
                    return None;
                };
                Some(op.compare(current, *value))
            },
            Self::TimeWindow { start_hour, end_hour } => {
                Some(hour_in_window(services.clock.current_hour(), *start_hour, *end_hour))
            },
            Self::TimePeriodEquals(period) => Some(services.clock.current_period() == *period),
            Self::DayAtLeast(day) => Some(services.clock.current_day() >= *day),
            Self::RelationshipTierAtLeast { from, to, tier } => {
                let from = known_character(services, from.as_deref(), "RelationshipTierAtLeast")?;
                let to = known_character(services, to.as_deref(), "RelationshipTierAtLeast")?;
                let tier = required(tier.as_deref(), "RelationshipTierAtLeast", "tier")?;
                let Some(required_index) = services.relationships.tier_index(tier) else {
                    warn!("RelationshipTierAtLeast: unknown tier '{tier}'");
                    return None;
                };
                let current = services.current_tier_index(from, to)?;
                Some(current >= required_index)
            },
        }
    }
}

/// A predicate on world state, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    #[serde(default)]
    pub negate: bool,
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self { kind, negate: false }
    }

    pub fn negated(kind: ConditionKind) -> Self {
        Self { kind, negate: true }
    }

    pub fn flag(flag: &str, value: bool) -> Self {
        Self::new(ConditionKind::FlagEquals {
            flag: Some(flag.to_string()),
            value,
        })
    }

    /// Evaluate the condition. A check whose references do not resolve is
    /// `false` whether or not the condition is negated.
    pub fn evaluate(&self, services: &Services<'_>) -> bool {
        let result = self.kind.check(services).is_some_and(|raw| raw != self.negate);
        debug!(
            "condition {}{:?} -> {result}",
            if self.negate { "NOT " } else { "" },
            self.kind
        );
        result
    }
}

fn required<'a>(value: Option<&'a str>, kind: &str, field: &str) -> Option<&'a str> {
    if value.is_none() {
        warn!("{kind}: {field} is unassigned");
    }
    value
}

fn known_character<'a>(services: &Services<'_>, character: Option<&'a str>, kind: &str) -> Option<&'a str> {
    let character = required(character, kind, "character")?;
    if services.characters.contains(character) {
        Some(character)
    } else {
        warn!("{kind}: unknown character '{character}'");
        None
    }
}

fn hour_in_window(hour: u8, start: u8, end: u8) -> bool {
    match start.cmp(&end) {
        std::cmp::Ordering::Equal => true,
        std::cmp::Ordering::Less => (start..end).contains(&hour),
        std::cmp::Ordering::Greater => hour >= start || hour < end,
    }
}
