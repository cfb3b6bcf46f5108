//! Event consequences.
//!
//! Consequences are the "effects" half of an event: once an event's dialogue
//! (if any) finishes, its consequences are applied in list order against the
//! [`Services`] bundle.
//!
//! # Error Handling
//!
//! `Consequence::apply` returns a [`ConsequenceError`] when a reference is
//! unassigned or does not resolve. Nothing is written in that case, and the
//! engine logs the error and carries on with the next consequence.
//!
//! # Logging
//!
//! Every applied consequence logs in a consistent format:
//! ```text
//! └─ consequence: Kind(parameters)
//! ```

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{ServiceError, Services};

/// Reasons a consequence could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsequenceError {
    #[error("{kind}: {field} is unassigned")]
    Unassigned { kind: &'static str, field: &'static str },
    #[error("{kind}: unknown character '{character}'")]
    UnknownCharacter { kind: &'static str, character: String },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Effects an event can apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsequenceKind {
    SetFlag {
        flag: Option<String>,
        value: bool,
    },
    ModifyStat {
        character: Option<String>,
        stat: Option<String>,
        delta: i32,
    },
    /// Change how `from` feels about `to`; `mutual` applies the same change in reverse.
    ModifyRelationship {
        from: Option<String>,
        to: Option<String>,
        amount: i32,
        #[serde(default)]
        mutual: bool,
    },
}

impl ConsequenceKind {
    fn name(&self) -> &'static str {
        match self {
            Self::SetFlag { .. } => "SetFlag",
            Self::ModifyStat { .. } => "ModifyStat",
            Self::ModifyRelationship { .. } => "ModifyRelationship",
        }
    }

    /// Perform the effect.
    ///
    /// # Errors
    /// - on unassigned or unknown references
    pub fn apply(&self, services: &mut Services<'_>) -> Result<(), ConsequenceError> {
        let kind = self.name();
        match self {
            Self::SetFlag { flag, value } => {
                let flag = required(flag.as_deref(), kind, "flag")?;
                services.flags.set(flag, *value);
                info!("└─ consequence: SetFlag(\"{flag}\", {value})");
            },
            Self::ModifyStat { character, stat, delta } => {
                let character = known_character(services, character.as_deref(), kind)?;
                let stat = required(stat.as_deref(), kind, "stat")?;
                let now = services.stats.modify(character, stat, *delta)?;
                info!("└─ consequence: ModifyStat({character}.{stat} {delta:+} => {now})");
            },
            Self::ModifyRelationship {
                from,
                to,
                amount,
                mutual,
            } => {
                let from = known_character(services, from.as_deref(), kind)?;
                let to = known_character(services, to.as_deref(), kind)?;
                let before = services.relationships.score(from, to);
                let score = services.relationships.modify(from, to, *amount)?;
                info!("└─ consequence: ModifyRelationship({from} -> {to} {amount:+} => {score})");
                if *mutual {
                    match services.relationships.modify(to, from, *amount) {
                        Ok(reverse) => {
                            info!("└─ consequence: ModifyRelationship({to} -> {from} {amount:+} => {reverse})");
                        },
                        Err(err) => {
                            // a mutual change is all or nothing: undo the forward half
                            if let Err(undo) = services.relationships.modify(from, to, before.saturating_sub(score)) {
                                warn!("could not roll back {from} -> {to} after failed mutual change: {undo}");
                            }
                            return Err(err.into());
                        },
                    }
                }
            },
        }
        Ok(())
    }
}

/// A side effect applied when an event completes. `skip` disables it without removing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consequence {
    pub kind: ConsequenceKind,
    #[serde(default)]
    pub skip: bool,
}

impl Consequence {
    pub fn new(kind: ConsequenceKind) -> Self {
        Self { kind, skip: false }
    }

    pub fn set_flag(flag: &str, value: bool) -> Self {
        Self::new(ConsequenceKind::SetFlag {
            flag: Some(flag.to_string()),
            value,
        })
    }

    pub fn modify_stat(character: &str, stat: &str, delta: i32) -> Self {
        Self::new(ConsequenceKind::ModifyStat {
            character: Some(character.to_string()),
            stat: Some(stat.to_string()),
            delta,
        })
    }

    /// Apply the effect unless `skip` is set.
    ///
    /// # Errors
    /// - on unassigned or unknown references; nothing is written in that case
    pub fn apply(&self, services: &mut Services<'_>) -> Result<(), ConsequenceError> {
        if self.skip {
            info!("└─ consequence skipped: {}", self.kind.name());
            return Ok(());
        }
        self.kind.apply(services)
    }
}

fn required<'a>(value: Option<&'a str>, kind: &'static str, field: &'static str) -> Result<&'a str, ConsequenceError> {
    value.ok_or(ConsequenceError::Unassigned { kind, field })
}

fn known_character<'a>(
    services: &Services<'_>,
    character: Option<&'a str>,
    kind: &'static str,
) -> Result<&'a str, ConsequenceError> {
    let character = required(character, kind, "character")?;
    if services.characters.contains(character) {
        Ok(character)
    } else {
        Err(ConsequenceError::UnknownCharacter {
            kind,
            character: character.to_string(),
        })
    }
}
