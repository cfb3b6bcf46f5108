//! Dialogue graphs.
//!
//! A [`DialogueGraph`] is an ordered list of [`DialogueNode`]s addressed by
//! stable string ids. Each node either branches (non-empty `choices`), links to
//! a single `next` node, or ends the conversation. Traversal is handled by
//! [`runner::DialogueRunner`].

pub mod runner;

pub use runner::*;

use std::cell::OnceCell;
use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::services::RelationshipService;

/// Relationship score change applied when a node is entered or a choice is picked.
///
/// `None` on either side is an unassigned reference; the change is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDelta {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: i32,
    #[serde(default)]
    pub mutual: bool,
}

impl RelationshipDelta {
    pub fn new(from: &str, to: &str, amount: i32) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            amount,
            mutual: false,
        }
    }

    #[must_use]
    pub fn mutual(mut self) -> Self {
        self.mutual = true;
        self
    }

    /// Apply the change (both directions if mutual). Problems are logged, never propagated.
    pub fn apply(&self, relationships: &mut dyn RelationshipService) {
        let (Some(from), Some(to)) = (self.from.as_deref(), self.to.as_deref()) else {
            warn!("relationship change skipped: unassigned character ({self:?})");
            return;
        };
        let mut pairs = vec![(from, to)];
        if self.mutual {
            pairs.push((to, from));
        }
        for (a, b) in pairs {
            match relationships.modify(a, b, self.amount) {
                Ok(score) => info!("relationship {a} -> {b} {:+} (now {score})", self.amount),
                Err(e) => warn!("relationship change {a} -> {b} failed: {e}"),
            }
        }
    }
}

/// Gate on a dialogue choice: the relationship `from` -> `to` must be at least `tier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRequirement {
    pub from: Option<String>,
    pub to: Option<String>,
    pub tier: String,
}

impl TierRequirement {
    pub fn new(from: &str, to: &str, tier: &str) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            tier: tier.to_string(),
        }
    }

    pub fn is_met(&self, relationships: &dyn RelationshipService) -> bool {
        let (Some(from), Some(to)) = (self.from.as_deref(), self.to.as_deref()) else {
            warn!("tier requirement has an unassigned character ({self:?})");
            return false;
        };
        let Some(required) = relationships.tier_index(&self.tier) else {
            warn!("tier requirement names unknown tier '{}'", self.tier);
            return false;
        };
        relationships
            .current_tier(from, to)
            .and_then(|t| relationships.tier_index(&t))
            .is_some_and(|current| current >= required)
    }
}

/// A player response offered at a branching node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueChoice {
    pub text: String,
    /// Node to move to; `None` ends the dialogue.
    pub target: Option<String>,
    #[serde(default)]
    pub relationship_changes: Vec<RelationshipDelta>,
    #[serde(default)]
    pub requirements: Vec<TierRequirement>,
}

impl DialogueChoice {
    pub fn new(text: &str, target: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            target: target.map(str::to_string),
            relationship_changes: Vec::new(),
            requirements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_change(mut self, delta: RelationshipDelta) -> Self {
        self.relationship_changes.push(delta);
        self
    }

    #[must_use]
    pub fn requiring(mut self, requirement: TierRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// True when every tier requirement passes.
    pub fn is_available(&self, relationships: &dyn RelationshipService) -> bool {
        self.requirements.iter().all(|r| r.is_met(relationships))
    }
}

/// A choice the player may currently pick, with its index into the node's choice list.
#[derive(Debug, Clone, Copy)]
pub struct AvailableChoice<'a> {
    pub index: usize,
    pub choice: &'a DialogueChoice,
}

/// A single line of dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: String,
    pub speaker: Option<String>,
    #[serde(default)]
    pub display_name: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
    /// Followed only when `choices` is empty.
    pub next: Option<String>,
    #[serde(default)]
    pub relationship_changes: Vec<RelationshipDelta>,
}

impl DialogueNode {
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            speaker: None,
            display_name: String::new(),
            text: text.to_string(),
            choices: Vec::new(),
            next: None,
            relationship_changes: Vec::new(),
        }
    }

    #[must_use]
    pub fn spoken_by(mut self, speaker: &str, display_name: &str) -> Self {
        self.speaker = Some(speaker.to_string());
        self.display_name = display_name.to_string();
        self
    }

    #[must_use]
    pub fn with_next(mut self, next: &str) -> Self {
        self.next = Some(next.to_string());
        self
    }

    #[must_use]
    pub fn with_choice(mut self, choice: DialogueChoice) -> Self {
        self.choices.push(choice);
        self
    }

    #[must_use]
    pub fn with_change(mut self, delta: RelationshipDelta) -> Self {
        self.relationship_changes.push(delta);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty() && self.next.is_none()
    }

    /// Choices whose requirements currently pass.
    pub fn available_choices(&self, relationships: &dyn RelationshipService) -> Vec<AvailableChoice<'_>> {
        self.choices
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_available(relationships))
            .map(|(index, choice)| AvailableChoice { index, choice })
            .collect()
    }

    /// Every node id this node can lead to.
    fn links(&self) -> impl Iterator<Item = &str> {
        self.next
            .as_deref()
            .into_iter()
            .chain(self.choices.iter().filter_map(|c| c.target.as_deref()))
    }
}

/// A link to a node id that does not exist in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingLink {
    pub from_node: String,
    pub target: String,
}

/// Immutable-after-load dialogue graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueGraph {
    pub id: String,
    pub start: Option<String>,
    nodes: Vec<DialogueNode>,
    #[serde(skip)]
    index: OnceCell<HashMap<String, usize>>,
}

impl DialogueGraph {
    pub fn new(id: &str, start: Option<&str>, nodes: Vec<DialogueNode>) -> Self {
        Self {
            id: id.to_string(),
            start: start.map(str::to_string),
            nodes,
            index: OnceCell::new(),
        }
    }

    pub fn nodes(&self) -> &[DialogueNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<&DialogueNode> {
        self.nodes.first()
    }

    /// Look up a node by id. The id index is built on first use.
    pub fn node(&self, id: &str) -> Option<&DialogueNode> {
        let index = self.index.get_or_init(|| {
            let mut map = HashMap::with_capacity(self.nodes.len());
            for (pos, node) in self.nodes.iter().enumerate() {
                map.entry(node.id.clone()).or_insert(pos);
            }
            map
        });
        index.get(id).and_then(|pos| self.nodes.get(*pos))
    }

    /// Append a node at runtime. Refuses ids already present in the graph.
    pub fn add_node(&mut self, node: DialogueNode) -> bool {
        if self.node(&node.id).is_some() {
            warn!("dialogue '{}': node id '{}' already exists", self.id, node.id);
            return false;
        }
        self.nodes.push(node);
        self.index = OnceCell::new();
        true
    }

    /// Remove a node at runtime. Links to it become dangling (and end traversal).
    pub fn remove_node(&mut self, id: &str) -> Option<DialogueNode> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        self.index = OnceCell::new();
        Some(self.nodes.remove(pos))
    }

    /// Every `next`/choice target (and the declared start) that does not resolve.
    pub fn dangling_links(&self) -> Vec<DanglingLink> {
        let mut out = Vec::new();
        if let Some(start) = &self.start
            && self.node(start).is_none()
        {
            out.push(DanglingLink {
                from_node: String::new(),
                target: start.clone(),
            });
        }
        for node in &self.nodes {
            for target in node.links() {
                if self.node(target).is_none() {
                    out.push(DanglingLink {
                        from_node: node.id.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
        out
    }
}
