use serde::{Deserialize, Serialize};

/// Stable identifier used across `StoryDef` references.
pub type Id = String;

/// Top-level story data loaded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoryDef {
    pub story: StoryMetaDef,
    #[serde(default)]
    pub locations: Vec<LocationDef>,
    #[serde(default)]
    pub characters: Vec<CharacterDef>,
    #[serde(default)]
    pub stats: Vec<StatDef>,
    #[serde(default)]
    pub dialogues: Vec<DialogueDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
}

/// Story-level metadata and startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoryMetaDef {
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub intro: String,
    pub start_location: Id,
}

/// A place the player can be. Events may be pinned to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDef {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

/// A character that can speak, hold stats, and have relationships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDef {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub player: bool,
}

/// Numeric stat definition; values are clamped to `min..=max`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatDef {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub min: i32,
    #[serde(default = "default_stat_max")]
    pub max: i32,
    #[serde(default)]
    pub default: i32,
}

fn default_stat_max() -> i32 {
    100
}

/// A dialogue graph: an ordered list of nodes and an optional start node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueDef {
    pub id: Id,
    pub start: Option<Id>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

/// A single line of dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: Id,
    pub speaker: Option<Id>,
    #[serde(default)]
    pub display_name: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<ChoiceDef>,
    pub next: Option<Id>,
    #[serde(default)]
    pub relationship_changes: Vec<RelationshipDeltaDef>,
}

/// A player response offered at a branching node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDef {
    pub text: String,
    pub target: Option<Id>,
    #[serde(default)]
    pub relationship_changes: Vec<RelationshipDeltaDef>,
    #[serde(default)]
    pub requires: Vec<TierRequirementDef>,
}

/// Relationship score change between two characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDeltaDef {
    pub from: Id,
    pub to: Id,
    pub amount: i32,
    #[serde(default)]
    pub mutual: bool,
}

/// Requires the relationship from one character to another to be at least `tier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRequirementDef {
    pub from: Id,
    pub to: Id,
    pub tier: String,
}

/// A scripted story event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDef {
    pub id: Id,
    pub name: String,
    pub location: Option<Id>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub one_time: bool,
    #[serde(default = "default_auto_trigger")]
    pub auto_trigger: bool,
    pub dialogue: Option<Id>,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
    #[serde(default)]
    pub consequences: Vec<ConsequenceDef>,
}

fn default_auto_trigger() -> bool {
    true
}

/// A predicate on world state, optionally negated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionDef {
    pub check: CheckDef,
    #[serde(default)]
    pub negate: bool,
}

/// Kinds of world-state checks an event can require.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckDef {
    FlagEquals { flag: String, value: bool },
    StatCompare { character: Id, stat: Id, op: ComparisonDef, value: i32 },
    TimeWindow { start_hour: u8, end_hour: u8 },
    TimePeriodEquals { period: TimePeriodDef },
    DayAtLeast { day: u32 },
    RelationshipTierAtLeast { from: Id, to: Id, tier: String },
}

/// Comparison operators for stat checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonDef {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

/// Named parts of the in-game day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimePeriodDef {
    LateNight,
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// A side effect applied when an event completes, optionally skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsequenceDef {
    pub effect: EffectDef,
    #[serde(default)]
    pub skip: bool,
}

/// Kinds of effects an event can apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectDef {
    SetFlag { flag: String, value: bool },
    ModifyStat { character: Id, stat: Id, delta: i32 },
    ModifyRelationship { from: Id, to: Id, amount: i32, #[serde(default)] mutual: bool },
}
