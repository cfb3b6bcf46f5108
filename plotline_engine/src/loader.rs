//! Loader utilities for building a playable story from serialized data.
//!
//! Story content comes from a `StoryDef` (RON). It is validated with
//! `plotline_data::validate_story`, converted to runtime types, and finally
//! installed into a [`PlotWorld`] and an [`EventEngine`].

pub mod storydef;

use std::path::Path;

use anyhow::{Result, bail};
use log::{info, warn};

use plotline_data::{StoryDef, ValidationError};

use crate::dialogue::DialogueGraph;
use crate::engine::EventEngine;
use crate::event::{ConditionKind, EventDefinition};
use crate::world::{PlotWorld, StatDefinition};
use storydef::{KnownIds, dialogue_from_def, event_from_def, load_storydef};

/// Title card and starting point of a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryMeta {
    pub title: String,
    pub slug: String,
    pub author: String,
    pub version: String,
    pub intro: String,
    pub start_location: String,
}

/// A named place the player can be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub player: bool,
}

/// A story converted to runtime types, ready to install.
#[derive(Debug, Clone)]
pub struct Story {
    pub meta: StoryMeta,
    pub places: Vec<Place>,
    pub characters: Vec<Character>,
    pub stats: Vec<StatDefinition>,
    pub dialogues: Vec<DialogueGraph>,
    pub events: Vec<EventDefinition>,
}

impl Story {
    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    /// Register characters and stats with `world`, move the player to the
    /// start location, and hand dialogues and events to `engine`.
    pub fn install(&self, world: &mut PlotWorld, engine: &mut EventEngine) {
        for character in &self.characters {
            world.roster.add(character.id.clone(), character.name.clone());
            if character.player {
                world.roster.set_player(character.id.clone());
            }
        }
        for stat in &self.stats {
            world.stats.define(stat.clone());
        }
        world.location.move_to(&self.meta.start_location);
        self.warn_unknown_tiers(world);

        for graph in &self.dialogues {
            engine.add_dialogue(graph.clone());
        }
        for event in &self.events {
            engine.add_event(event.clone());
        }
        info!(
            "story '{}' installed: {} event(s), {} dialogue(s)",
            self.meta.title,
            self.events.len(),
            self.dialogues.len()
        );
    }

    /// Tier names are configured separately from the story; flag any the story
    /// uses that the configured tier bands do not define.
    fn warn_unknown_tiers(&self, world: &PlotWorld) {
        let config = world.relationships.config();
        let from_events = self.events.iter().flat_map(|e| &e.conditions).filter_map(|c| match &c.kind {
            ConditionKind::RelationshipTierAtLeast { tier: Some(tier), .. } => Some(tier.as_str()),
            _ => None,
        });
        let from_choices = self
            .dialogues
            .iter()
            .flat_map(DialogueGraph::nodes)
            .flat_map(|n| &n.choices)
            .flat_map(|c| &c.requirements)
            .map(|r| r.tier.as_str());
        for tier in from_events.chain(from_choices) {
            if config.tier_index(tier).is_none() {
                warn!("story uses relationship tier '{tier}', which is not configured");
            }
        }
    }
}

/// Load, validate and convert the story at `path`.
///
/// # Errors
/// Errors bubble up from file IO, RON parsing, or fatal validation problems.
pub fn load_story(path: &Path) -> Result<Story> {
    let def = load_storydef(path)?;
    validate_storydef(&def)?;
    let story = build_story(&def);
    info!("{} location(s) loaded", story.places.len());
    info!("{} character(s) loaded", story.characters.len());
    info!("{} stat(s) loaded", story.stats.len());
    info!("{} dialogue(s) loaded", story.dialogues.len());
    info!("{} event(s) loaded", story.events.len());
    Ok(story)
}

/// Convert an already-validated `StoryDef`.
pub fn build_story(def: &StoryDef) -> Story {
    let known = KnownIds::from_def(def);
    let meta = &def.story;
    Story {
        meta: StoryMeta {
            title: meta.title.clone(),
            slug: meta.slug.clone(),
            author: meta.author.clone(),
            version: meta.version.clone(),
            intro: meta.intro.clone(),
            start_location: meta.start_location.clone(),
        },
        places: def
            .locations
            .iter()
            .map(|l| Place {
                id: l.id.clone(),
                name: l.name.clone(),
                desc: l.desc.clone(),
            })
            .collect(),
        characters: def
            .characters
            .iter()
            .map(|c| Character {
                id: c.id.clone(),
                name: c.name.clone(),
                player: c.player,
            })
            .collect(),
        stats: def
            .stats
            .iter()
            .map(|s| StatDefinition {
                id: s.id.clone(),
                name: s.name.clone(),
                min: s.min,
                max: s.max,
                default: s.default,
            })
            .collect(),
        dialogues: def.dialogues.iter().map(|d| dialogue_from_def(d, &known)).collect(),
        events: def.events.iter().map(|e| event_from_def(e, &known)).collect(),
    }
}

/// Log every validation problem and bail if any of them are fatal.
fn validate_storydef(def: &StoryDef) -> Result<()> {
    let (fatal, warnings): (Vec<ValidationError>, Vec<ValidationError>) =
        plotline_data::validate_story(def).into_iter().partition(ValidationError::is_fatal);
    for problem in &warnings {
        warn!("story validation: {problem}");
    }
    if fatal.is_empty() {
        return Ok(());
    }
    let details = fatal
        .into_iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("story validation failed:\n{details}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, PlotlineConfig};
    use crate::services::{LocationService, StatService};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const STORY: &str = r#"
(
    story: (
        title: "Harbor Lights",
        start_location: "docks",
    ),
    locations: [
        (id: "docks", name: "The Docks"),
        (id: "square", name: "Town Square", desc: "Cobbles and gulls."),
    ],
    characters: [
        (id: "hero", name: "Ash", player: true),
        (id: "mira", name: "Mira"),
    ],
    stats: [
        (id: "coins", name: "Coins", max: 50, default: 5),
    ],
    dialogues: [
        (
            id: "hello",
            start: Some("n0"),
            nodes: [
                (id: "n0", speaker: Some("mira"), display_name: "Mira", text: "Ahoy.", next: Some("n1")),
                (id: "n1", text: "Safe travels."),
            ],
        ),
    ],
    events: [
        (
            id: "arrival",
            name: "Arrival",
            location: Some("docks"),
            one_time: true,
            dialogue: Some("hello"),
            conditions: [ (check: dayAtLeast(day: 1)) ],
            consequences: [ (effect: modifyStat(character: "hero", stat: "coins", delta: 3)) ],
        ),
    ],
)
"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write story");
        file
    }

    #[test]
    fn loads_and_installs_story() {
        let file = write_temp(STORY);
        let story = load_story(file.path()).expect("story loads");
        assert_eq!(story.meta.title, "Harbor Lights");
        assert_eq!(story.place("square").map(|p| p.desc.as_str()), Some("Cobbles and gulls."));

        let mut world = PlotWorld::new(&PlotlineConfig::default());
        let mut engine = EventEngine::new(EngineConfig::default());
        story.install(&mut world, &mut engine);

        assert_eq!(world.roster.player(), Some("hero"));
        assert_eq!(world.location.current_location().as_deref(), Some("docks"));
        assert_eq!(world.stats.get("hero", "coins"), Some(5));
        assert!(engine.event("arrival").is_some());
        assert!(engine.dialogue("hello").is_some());
    }

    #[test]
    fn fatal_validation_errors_bail() {
        let duplicated = STORY.replace("(id: \"square\"", "(id: \"docks\"");
        let file = write_temp(&duplicated);
        let err = load_story(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate location id 'docks'"));
    }

    #[test]
    fn dangling_references_only_warn() {
        let dangling = STORY.replace("stat: \"coins\", delta", "stat: \"gems\", delta");
        let file = write_temp(&dangling);
        let story = load_story(file.path()).expect("story still loads");
        let consequence = &story.events[0].consequences[0];
        assert!(matches!(
            &consequence.kind,
            crate::event::ConsequenceKind::ModifyStat { stat: None, .. }
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_story(Path::new("/definitely/not/here.ron")).is_err());
    }

    #[test]
    fn malformed_ron_is_an_error() {
        let file = write_temp("( story: ");
        assert!(load_story(file.path()).is_err());
    }
}
