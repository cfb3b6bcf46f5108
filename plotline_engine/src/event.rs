//! Event module --
//!
//! An [`EventDefinition`] is a scripted story beat: where it can happen, how
//! urgent it is, whether it fires once or repeatedly, which dialogue it plays,
//! the `Conditions` that must all hold, and the `Consequences` it applies.

pub mod condition;
pub mod consequence;

pub use condition::*;
pub use consequence::*;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::services::Services;

/// A static, authored story event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    /// `None` lets the event fire anywhere.
    pub required_location: Option<String>,
    pub priority: i32,
    pub one_time: bool,
    pub auto_trigger: bool,
    /// Id of a graph in the engine's dialogue library.
    pub dialogue: Option<String>,
    pub conditions: Vec<Condition>,
    pub consequences: Vec<Consequence>,
}

impl EventDefinition {
    /// A repeatable, auto-triggering event with no location, dialogue, conditions, or consequences.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            required_location: None,
            priority: 0,
            one_time: false,
            auto_trigger: true,
            dialogue: None,
            conditions: Vec::new(),
            consequences: Vec::new(),
        }
    }

    #[must_use]
    pub fn at(mut self, location: &str) -> Self {
        self.required_location = Some(location.to_string());
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn once(mut self) -> Self {
        self.one_time = true;
        self
    }

    #[must_use]
    pub fn manual(mut self) -> Self {
        self.auto_trigger = false;
        self
    }

    #[must_use]
    pub fn with_dialogue(mut self, dialogue: &str) -> Self {
        self.dialogue = Some(dialogue.to_string());
        self
    }

    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn then(mut self, consequence: Consequence) -> Self {
        self.consequences.push(consequence);
        self
    }

    pub fn matches_location(&self, location: &str) -> bool {
        self.required_location.as_deref().is_none_or(|required| required == location)
    }

    /// True when every condition holds. Stops at the first failure.
    pub fn conditions_pass(&self, services: &Services<'_>) -> bool {
        for (idx, condition) in self.conditions.iter().enumerate() {
            if !condition.evaluate(services) {
                debug!("event '{}': condition {idx} failed", self.id);
                return false;
            }
        }
        true
    }
}
