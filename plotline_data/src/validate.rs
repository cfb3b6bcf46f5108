use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Validation problem found in a `StoryDef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingReference { kind: &'static str, id: String, context: String },
    EmptyDialogue { id: String },
    InvalidValue { context: String },
}

impl ValidationError {
    /// Returns true for problems that make the story unusable.
    ///
    /// Dangling references and empty dialogues are tolerated at runtime (the
    /// affected condition, consequence, or dialogue link degrades), so they are
    /// only warnings. Duplicate identities and out-of-range values are not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateId { .. } | Self::InvalidValue { .. })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::EmptyDialogue { id } => {
                write!(f, "dialogue '{id}' has no nodes")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate cross-references and basic invariants in a `StoryDef`.
///
/// ```
/// use plotline_data::{LocationDef, StoryDef, StoryMetaDef, validate_story};
///
/// let story = StoryDef {
///     story: StoryMetaDef {
///         title: "Demo".into(),
///         start_location: "square".into(),
///         ..StoryMetaDef::default()
///     },
///     locations: vec![LocationDef {
///         id: "square".into(),
///         name: "Town Square".into(),
///         desc: String::new(),
///     }],
///     ..StoryDef::default()
/// };
/// assert!(validate_story(&story).is_empty());
/// ```
pub fn validate_story(story: &StoryDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut locations = HashSet::new();
    let mut characters = HashSet::new();
    let mut stats = HashSet::new();
    let mut dialogues = HashSet::new();
    let mut events = HashSet::new();

    track_ids(
        "location",
        story.locations.iter().map(|l| l.id.as_str()),
        &mut locations,
        &mut errors,
    );
    track_ids(
        "character",
        story.characters.iter().map(|c| c.id.as_str()),
        &mut characters,
        &mut errors,
    );
    track_ids("stat", story.stats.iter().map(|s| s.id.as_str()), &mut stats, &mut errors);
    track_ids(
        "dialogue",
        story.dialogues.iter().map(|d| d.id.as_str()),
        &mut dialogues,
        &mut errors,
    );
    track_ids("event", story.events.iter().map(|e| e.id.as_str()), &mut events, &mut errors);

    let ids = IdSets {
        locations: &locations,
        characters: &characters,
        stats: &stats,
        dialogues: &dialogues,
    };

    if story.story.start_location.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: "story start location missing".to_string(),
        });
    } else {
        check_ref(
            "location",
            &story.story.start_location,
            ids.locations,
            "story start location".to_string(),
            &mut errors,
        );
    }

    for stat in &story.stats {
        if stat.min > stat.max || !(stat.min..=stat.max).contains(&stat.default) {
            errors.push(ValidationError::InvalidValue {
                context: format!(
                    "stat '{}' range {}..={} with default {}",
                    stat.id, stat.min, stat.max, stat.default
                ),
            });
        }
    }

    for dialogue in &story.dialogues {
        validate_dialogue(dialogue, &ids, &mut errors);
    }

    for event in &story.events {
        let context = format!("event '{}'", event.id);
        if let Some(location) = &event.location {
            check_ref("location", location, ids.locations, context.clone(), &mut errors);
        }
        if let Some(dialogue) = &event.dialogue {
            check_ref("dialogue", dialogue, ids.dialogues, context.clone(), &mut errors);
        }
        for condition in &event.conditions {
            validate_check(&condition.check, &ids, &mut errors, &context);
        }
        for consequence in &event.consequences {
            validate_effect(&consequence.effect, &ids, &mut errors, &context);
        }
    }

    errors
}

struct IdSets<'a> {
    locations: &'a HashSet<String>,
    characters: &'a HashSet<String>,
    stats: &'a HashSet<String>,
    dialogues: &'a HashSet<String>,
}

fn track_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    set: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for id in ids {
        if !set.insert(id.to_string()) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

fn check_ref(kind: &'static str, id: &str, set: &HashSet<String>, context: String, errors: &mut Vec<ValidationError>) {
    if !set.contains(id) {
        errors.push(ValidationError::MissingReference {
            kind,
            id: id.to_string(),
            context,
        });
    }
}

fn validate_dialogue(dialogue: &DialogueDef, ids: &IdSets<'_>, errors: &mut Vec<ValidationError>) {
    if dialogue.nodes.is_empty() {
        errors.push(ValidationError::EmptyDialogue {
            id: dialogue.id.clone(),
        });
        return;
    }

    let mut nodes = HashSet::new();
    track_ids(
        "dialogue node",
        dialogue.nodes.iter().map(|n| n.id.as_str()),
        &mut nodes,
        errors,
    );

    if let Some(start) = &dialogue.start {
        check_ref(
            "dialogue node",
            start,
            &nodes,
            format!("dialogue '{}' start", dialogue.id),
            errors,
        );
    }

    for node in &dialogue.nodes {
        let context = format!("dialogue '{}' node '{}'", dialogue.id, node.id);
        if let Some(speaker) = &node.speaker {
            check_ref("character", speaker, ids.characters, context.clone(), errors);
        }
        if let Some(next) = &node.next {
            check_ref("dialogue node", next, &nodes, context.clone(), errors);
        }
        for delta in &node.relationship_changes {
            validate_delta(delta, ids, errors, &context);
        }
        for (idx, choice) in node.choices.iter().enumerate() {
            let context = format!("{context} choice {idx}");
            if let Some(target) = &choice.target {
                check_ref("dialogue node", target, &nodes, context.clone(), errors);
            }
            for delta in &choice.relationship_changes {
                validate_delta(delta, ids, errors, &context);
            }
            for req in &choice.requires {
                check_ref("character", &req.from, ids.characters, context.clone(), errors);
                check_ref("character", &req.to, ids.characters, context.clone(), errors);
            }
        }
    }
}

fn validate_delta(delta: &RelationshipDeltaDef, ids: &IdSets<'_>, errors: &mut Vec<ValidationError>, context: &str) {
    check_ref("character", &delta.from, ids.characters, context.to_string(), errors);
    check_ref("character", &delta.to, ids.characters, context.to_string(), errors);
}

fn validate_check(check: &CheckDef, ids: &IdSets<'_>, errors: &mut Vec<ValidationError>, context: &str) {
    match check {
        CheckDef::FlagEquals { flag, .. } => {
            if flag.trim().is_empty() {
                errors.push(ValidationError::MissingReference {
                    kind: "flag",
                    id: flag.clone(),
                    context: format!("{context} condition"),
                });
            }
        },
        CheckDef::StatCompare { character, stat, .. } => {
            check_ref("character", character, ids.characters, context.to_string(), errors);
            check_ref("stat", stat, ids.stats, context.to_string(), errors);
        },
        CheckDef::TimeWindow { start_hour, end_hour } => {
            if *start_hour > 23 || *end_hour > 23 {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{context} time window {start_hour}..{end_hour} outside 0-23"),
                });
            }
        },
        CheckDef::TimePeriodEquals { .. } | CheckDef::DayAtLeast { .. } => {},
        CheckDef::RelationshipTierAtLeast { from, to, .. } => {
            check_ref("character", from, ids.characters, context.to_string(), errors);
            check_ref("character", to, ids.characters, context.to_string(), errors);
        },
    }
}

fn validate_effect(effect: &EffectDef, ids: &IdSets<'_>, errors: &mut Vec<ValidationError>, context: &str) {
    match effect {
        EffectDef::SetFlag { flag, .. } => {
            if flag.trim().is_empty() {
                errors.push(ValidationError::MissingReference {
                    kind: "flag",
                    id: flag.clone(),
                    context: format!("{context} consequence"),
                });
            }
        },
        EffectDef::ModifyStat { character, stat, .. } => {
            check_ref("character", character, ids.characters, context.to_string(), errors);
            check_ref("stat", stat, ids.stats, context.to_string(), errors);
        },
        EffectDef::ModifyRelationship { from, to, .. } => {
            check_ref("character", from, ids.characters, context.to_string(), errors);
            check_ref("character", to, ids.characters, context.to_string(), errors);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(id: &str) -> LocationDef {
        LocationDef {
            id: id.to_string(),
            name: format!("Location {id}"),
            desc: String::new(),
        }
    }

    fn node(id: &str, next: Option<&str>) -> NodeDef {
        NodeDef {
            id: id.to_string(),
            speaker: None,
            display_name: String::new(),
            text: format!("line {id}"),
            choices: Vec::new(),
            next: next.map(str::to_string),
            relationship_changes: Vec::new(),
        }
    }

    fn event(id: &str) -> EventDef {
        EventDef {
            id: id.to_string(),
            name: id.to_string(),
            location: None,
            priority: 0,
            one_time: false,
            auto_trigger: true,
            dialogue: None,
            conditions: Vec::new(),
            consequences: Vec::new(),
        }
    }

    fn base_story() -> StoryDef {
        StoryDef {
            story: StoryMetaDef {
                title: "Demo".into(),
                start_location: "square".into(),
                ..StoryMetaDef::default()
            },
            locations: vec![location("square")],
            ..StoryDef::default()
        }
    }

    #[test]
    fn valid_story_has_no_errors() {
        let mut story = base_story();
        story.dialogues = vec![DialogueDef {
            id: "greeting".into(),
            start: Some("n0".into()),
            nodes: vec![node("n0", Some("n1")), node("n1", None)],
        }];
        let mut ev = event("welcome");
        ev.location = Some("square".into());
        ev.dialogue = Some("greeting".into());
        story.events = vec![ev];
        assert!(validate_story(&story).is_empty());
    }

    #[test]
    fn duplicate_event_ids_are_fatal() {
        let mut story = base_story();
        story.events = vec![event("same"), event("same")];

        let errors = validate_story(&story);
        let dup = errors
            .iter()
            .find(|err| matches!(err, ValidationError::DuplicateId { kind, id } if *kind == "event" && id == "same"))
            .expect("duplicate event reported");
        assert!(dup.is_fatal());
    }

    #[test]
    fn dangling_dialogue_links_are_warnings() {
        let mut story = base_story();
        story.dialogues = vec![DialogueDef {
            id: "greeting".into(),
            start: None,
            nodes: vec![node("n0", Some("nowhere"))],
        }];

        let errors = validate_story(&story);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::MissingReference { kind, id, .. } if *kind == "dialogue node" && id == "nowhere"
        ));
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn empty_dialogue_is_reported() {
        let mut story = base_story();
        story.dialogues = vec![DialogueDef {
            id: "silence".into(),
            start: None,
            nodes: Vec::new(),
        }];
        let errors = validate_story(&story);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyDialogue { id } if id == "silence")));
    }

    #[test]
    fn out_of_range_hours_are_fatal() {
        let mut story = base_story();
        let mut ev = event("late");
        ev.conditions.push(ConditionDef {
            check: CheckDef::TimeWindow {
                start_hour: 22,
                end_hour: 25,
            },
            negate: false,
        });
        story.events = vec![ev];
        let errors = validate_story(&story);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidValue { .. }) && e.is_fatal()));
    }

    #[test]
    fn unknown_stat_in_consequence_is_reported() {
        let mut story = base_story();
        story.characters = vec![CharacterDef {
            id: "hero".into(),
            name: "Hero".into(),
            player: true,
        }];
        let mut ev = event("train");
        ev.consequences.push(ConsequenceDef {
            effect: EffectDef::ModifyStat {
                character: "hero".into(),
                stat: "charm".into(),
                delta: 1,
            },
            skip: false,
        });
        story.events = vec![ev];
        let errors = validate_story(&story);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::MissingReference { kind, id, .. } if *kind == "stat" && id == "charm"))
        );
    }

    #[test]
    fn story_defs_parse_from_ron() {
        let text = r#"(
            story: (title: "Demo", start_location: "square"),
            locations: [(id: "square", name: "Square")],
            events: [(
                id: "bell",
                name: "Bell",
                location: Some("square"),
                dialogue: None,
                conditions: [(check: dayAtLeast(day: 2), negate: true)],
                consequences: [(effect: setFlag(flag: "rang", value: true))],
            )],
        )"#;
        let story: StoryDef = ron::from_str(text).expect("story parses");
        assert_eq!(story.events.len(), 1);
        assert!(story.events[0].auto_trigger);
        assert!(validate_story(&story).is_empty());
    }
}
