//! `StoryDef` loader and conversion helpers.
//!
//! Converts the serialized `StoryDef` data model into runtime engine types.
//! Character and stat references that the story never declares become `None`
//! (unassigned), so the affected condition, consequence or relationship change
//! degrades at runtime instead of failing the load.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use plotline_data::{
    CheckDef, ChoiceDef, ComparisonDef, ConditionDef, ConsequenceDef, DialogueDef, EffectDef, EventDef, NodeDef,
    RelationshipDeltaDef, StoryDef, TierRequirementDef, TimePeriodDef,
};

use crate::dialogue::{DialogueChoice, DialogueGraph, DialogueNode, RelationshipDelta, TierRequirement};
use crate::event::{Comparison, Condition, ConditionKind, Consequence, ConsequenceKind, EventDefinition};
use crate::services::TimePeriod;

/// Load a `StoryDef` from a RON file.
pub fn load_storydef(path: &Path) -> Result<StoryDef> {
    let text = fs::read_to_string(path).with_context(|| format!("reading story from '{}'", path.display()))?;
    ron::from_str(&text).with_context(|| format!("parsing story RON from '{}'", path.display()))
}

/// Declared ids used to decide which references resolve.
pub(crate) struct KnownIds {
    characters: HashSet<String>,
    stats: HashSet<String>,
}

impl KnownIds {
    pub(crate) fn from_def(def: &StoryDef) -> Self {
        Self {
            characters: def.characters.iter().map(|c| c.id.clone()).collect(),
            stats: def.stats.iter().map(|s| s.id.clone()).collect(),
        }
    }

    fn character(&self, id: &str) -> Option<String> {
        self.characters.contains(id).then(|| id.to_string())
    }

    fn stat(&self, id: &str) -> Option<String> {
        self.stats.contains(id).then(|| id.to_string())
    }
}

fn flag_ref(flag: &str) -> Option<String> {
    let flag = flag.trim();
    (!flag.is_empty()).then(|| flag.to_string())
}

pub(crate) fn dialogue_from_def(def: &DialogueDef, known: &KnownIds) -> DialogueGraph {
    let nodes = def.nodes.iter().map(|node| node_from_def(node, known)).collect();
    DialogueGraph::new(&def.id, def.start.as_deref(), nodes)
}

fn node_from_def(def: &NodeDef, known: &KnownIds) -> DialogueNode {
    DialogueNode {
        id: def.id.clone(),
        speaker: def.speaker.as_deref().and_then(|s| known.character(s)),
        display_name: def.display_name.clone(),
        text: def.text.clone(),
        choices: def.choices.iter().map(|c| choice_from_def(c, known)).collect(),
        next: def.next.clone(),
        relationship_changes: def.relationship_changes.iter().map(|d| delta_from_def(d, known)).collect(),
    }
}

fn choice_from_def(def: &ChoiceDef, known: &KnownIds) -> DialogueChoice {
    DialogueChoice {
        text: def.text.clone(),
        target: def.target.clone(),
        relationship_changes: def.relationship_changes.iter().map(|d| delta_from_def(d, known)).collect(),
        requirements: def.requires.iter().map(|r| requirement_from_def(r, known)).collect(),
    }
}

fn delta_from_def(def: &RelationshipDeltaDef, known: &KnownIds) -> RelationshipDelta {
    RelationshipDelta {
        from: known.character(&def.from),
        to: known.character(&def.to),
        amount: def.amount,
        mutual: def.mutual,
    }
}

fn requirement_from_def(def: &TierRequirementDef, known: &KnownIds) -> TierRequirement {
    TierRequirement {
        from: known.character(&def.from),
        to: known.character(&def.to),
        tier: def.tier.clone(),
    }
}

pub(crate) fn event_from_def(def: &EventDef, known: &KnownIds) -> EventDefinition {
    EventDefinition {
        id: def.id.clone(),
        name: def.name.clone(),
        required_location: def.location.clone(),
        priority: def.priority,
        one_time: def.one_time,
        auto_trigger: def.auto_trigger,
        dialogue: def.dialogue.clone(),
        conditions: def.conditions.iter().map(|c| condition_from_def(c, known)).collect(),
        consequences: def.consequences.iter().map(|c| consequence_from_def(c, known)).collect(),
    }
}

fn condition_from_def(def: &ConditionDef, known: &KnownIds) -> Condition {
    let kind = match &def.check {
        CheckDef::FlagEquals { flag, value } => ConditionKind::FlagEquals {
            flag: flag_ref(flag),
            value: *value,
        },
        CheckDef::StatCompare {
            character,
            stat,
            op,
            value,
        } => ConditionKind::StatCompare {
            character: known.character(character),
            stat: known.stat(stat),
            op: comparison_from_def(*op),
            value: *value,
        },
        CheckDef::TimeWindow { start_hour, end_hour } => ConditionKind::TimeWindow {
            start_hour: *start_hour,
            end_hour: *end_hour,
        },
        CheckDef::TimePeriodEquals { period } => ConditionKind::TimePeriodEquals(period_from_def(*period)),
        CheckDef::DayAtLeast { day } => ConditionKind::DayAtLeast(*day),
        CheckDef::RelationshipTierAtLeast { from, to, tier } => ConditionKind::RelationshipTierAtLeast {
            from: known.character(from),
            to: known.character(to),
            tier: flag_ref(tier),
        },
    };
    Condition {
        kind,
        negate: def.negate,
    }
}

fn consequence_from_def(def: &ConsequenceDef, known: &KnownIds) -> Consequence {
    let kind = match &def.effect {
        EffectDef::SetFlag { flag, value } => ConsequenceKind::SetFlag {
            flag: flag_ref(flag),
            value: *value,
        },
        EffectDef::ModifyStat { character, stat, delta } => ConsequenceKind::ModifyStat {
            character: known.character(character),
            stat: known.stat(stat),
            delta: *delta,
        },
        EffectDef::ModifyRelationship {
            from,
            to,
            amount,
            mutual,
        } => ConsequenceKind::ModifyRelationship {
            from: known.character(from),
            to: known.character(to),
            amount: *amount,
            mutual: *mutual,
        },
    };
    Consequence { kind, skip: def.skip }
}

fn comparison_from_def(def: ComparisonDef) -> Comparison {
    match def {
        ComparisonDef::Less => Comparison::Less,
        ComparisonDef::LessOrEqual => Comparison::LessOrEqual,
        ComparisonDef::Equal => Comparison::Equal,
        ComparisonDef::NotEqual => Comparison::NotEqual,
        ComparisonDef::GreaterOrEqual => Comparison::GreaterOrEqual,
        ComparisonDef::Greater => Comparison::Greater,
    }
}

fn period_from_def(def: TimePeriodDef) -> TimePeriod {
    match def {
        TimePeriodDef::LateNight => TimePeriod::LateNight,
        TimePeriodDef::Morning => TimePeriod::Morning,
        TimePeriodDef::Afternoon => TimePeriod::Afternoon,
        TimePeriodDef::Evening => TimePeriod::Evening,
        TimePeriodDef::Night => TimePeriod::Night,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotline_data::{CharacterDef, StatDef};

    fn known() -> KnownIds {
        KnownIds::from_def(&StoryDef {
            characters: vec![CharacterDef {
                id: "mira".into(),
                name: "Mira".into(),
                player: false,
            }],
            stats: vec![StatDef {
                id: "trust".into(),
                name: "Trust".into(),
                min: 0,
                max: 10,
                default: 0,
            }],
            ..StoryDef::default()
        })
    }

    #[test]
    fn unknown_references_become_unassigned() {
        let def = ConditionDef {
            check: CheckDef::StatCompare {
                character: "mira".into(),
                stat: "luck".into(),
                op: ComparisonDef::Greater,
                value: 1,
            },
            negate: true,
        };
        let cond = condition_from_def(&def, &known());
        assert!(cond.negate);
        assert_eq!(
            cond.kind,
            ConditionKind::StatCompare {
                character: Some("mira".into()),
                stat: None,
                op: Comparison::Greater,
                value: 1,
            }
        );
    }

    #[test]
    fn blank_flag_is_unassigned() {
        let def = ConsequenceDef {
            effect: EffectDef::SetFlag {
                flag: "  ".into(),
                value: true,
            },
            skip: false,
        };
        assert_eq!(
            consequence_from_def(&def, &known()).kind,
            ConsequenceKind::SetFlag { flag: None, value: true }
        );
    }

    #[test]
    fn dialogue_nodes_keep_order_and_links() {
        let def = DialogueDef {
            id: "chat".into(),
            start: Some("b".into()),
            nodes: vec![
                NodeDef {
                    id: "a".into(),
                    speaker: Some("ghost".into()),
                    display_name: "???".into(),
                    text: "Boo.".into(),
                    choices: Vec::new(),
                    next: None,
                    relationship_changes: Vec::new(),
                },
                NodeDef {
                    id: "b".into(),
                    speaker: Some("mira".into()),
                    display_name: "Mira".into(),
                    text: "Hi.".into(),
                    choices: Vec::new(),
                    next: Some("a".into()),
                    relationship_changes: vec![RelationshipDeltaDef {
                        from: "mira".into(),
                        to: "nobody".into(),
                        amount: 3,
                        mutual: false,
                    }],
                },
            ],
        };
        let graph = dialogue_from_def(&def, &known());
        assert_eq!(graph.start.as_deref(), Some("b"));
        assert_eq!(graph.nodes()[0].speaker, None);
        let b = graph.node("b").expect("node b");
        assert_eq!(b.next.as_deref(), Some("a"));
        assert_eq!(b.relationship_changes[0].to, None);
    }
}
