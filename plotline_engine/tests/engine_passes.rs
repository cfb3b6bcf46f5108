use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use plotline_engine::config::{EngineConfig, PlotlineConfig};
use plotline_engine::dialogue::{AvailableChoice, DialogueChoice, DialogueNode, RelationshipDelta, TierRequirement};
use plotline_engine::event::{Comparison, Condition, ConditionKind, Consequence, ConsequenceKind};
use plotline_engine::services::{FlagService, Presenter, StatService};
use plotline_engine::world::StatDefinition;
use plotline_engine::*;

/// Presenter that records what it was asked to show.
#[derive(Clone, Default)]
struct Transcript {
    lines: Rc<RefCell<Vec<String>>>,
}

impl Transcript {
    fn take(&self) -> Vec<String> {
        self.lines.borrow_mut().drain(..).collect()
    }
}

impl Presenter for Transcript {
    fn present_node(&mut self, node: &DialogueNode) {
        self.lines.borrow_mut().push(format!("node:{}", node.id));
    }

    fn show_choices(&mut self, choices: &[AvailableChoice<'_>]) {
        let shown: Vec<String> = choices.iter().map(|c| c.index.to_string()).collect();
        self.lines.borrow_mut().push(format!("choices:{}", shown.join(",")));
    }

    fn hide_choices(&mut self) {
        self.lines.borrow_mut().push("hide".into());
    }

    fn on_dialogue_end(&mut self) {
        self.lines.borrow_mut().push("end".into());
    }
}

fn setup(max_rechecks: usize) -> (EventEngine, PlotWorld, Transcript) {
    let transcript = Transcript::default();
    let engine = EventEngine::new(EngineConfig { max_rechecks })
        .with_runner(DialogueRunner::new(Box::new(transcript.clone())));
    let mut world = PlotWorld::new(&PlotlineConfig::default());
    world.roster.add("kit", "Kit");
    world.roster.add("oren", "Oren");
    world.roster.set_player("kit");
    world.stats.define(StatDefinition {
        id: "nerve".into(),
        name: "Nerve".into(),
        min: 0,
        max: 10,
        default: 5,
    });
    (engine, world, transcript)
}

fn interview() -> DialogueGraph {
    DialogueGraph::new(
        "interview",
        Some("question"),
        vec![
            DialogueNode::new("question", "Why are you here?")
                .spoken_by("oren", "Oren")
                .with_choice(
                    DialogueChoice::new("To help.", Some("thanks"))
                        .with_change(RelationshipDelta::new("oren", "kit", 15)),
                )
                .with_choice(
                    DialogueChoice::new("You know why.", Some("thanks"))
                        .requiring(TierRequirement::new("oren", "kit", "Friend")),
                )
                .with_choice(DialogueChoice::new("No reason.", None)),
            DialogueNode::new("thanks", "Then welcome."),
        ],
    )
}

#[test]
fn location_change_runs_dialogue_and_applies_consequences_on_completion() {
    let (mut engine, mut world, transcript) = setup(32);
    engine.add_dialogue(interview());
    engine.add_event(
        EventDefinition::new("interview", "Interview")
            .at("office")
            .once()
            .with_dialogue("interview")
            .then(Consequence::set_flag("hired", true))
            .then(Consequence::modify_stat("kit", "nerve", 20)),
    );

    let report = engine.on_location_changed("office", &mut world.services());
    assert_eq!(report.fired, vec!["interview"]);
    assert!(report.outcome.is_awaiting_dialogue());
    assert_eq!(transcript.take(), vec!["node:question", "choices:0,2"]);

    let err = engine.choose(1, &mut world.services()).unwrap_err();
    assert!(format!("{err}").contains("choice 1 is not available"));
    assert!(!world.flags.get("hired"));

    engine.choose(0, &mut world.services()).expect("choice accepted");
    assert_eq!(world.relationships.score("oren", "kit"), 15);
    assert_eq!(transcript.take(), vec!["hide", "node:thanks"]);

    let report = engine.continue_dialogue(&mut world.services()).expect("continue");
    assert_eq!(report.outcome, PassOutcome::Idle);
    assert!(world.flags.get("hired"));
    assert_eq!(world.stats.get("kit", "nerve"), Some(10));
    assert_eq!(transcript.take(), vec!["hide", "end"]);
    assert!(engine.is_completed("interview"));

    let report = engine.on_location_changed("office", &mut world.services());
    assert!(report.fired.is_empty());
}

#[test]
fn chain_of_events_completes_in_priority_order() {
    let (mut engine, mut world, _) = setup(32);
    engine.add_event(
        EventDefinition::new("closing", "Closing")
            .once()
            .when(Condition::flag("opened", true))
            .then(Consequence::set_flag("closed", true)),
    );
    engine.add_event(
        EventDefinition::new("opening", "Opening")
            .once()
            .with_priority(1)
            .then(Consequence::set_flag("opened", true)),
    );
    engine.add_event(EventDefinition::new("elsewhere", "Elsewhere").at("roof").once());

    let report = engine.evaluate("lobby", &mut world.services());
    assert_eq!(report.fired, vec!["opening", "closing"]);
    assert!(world.flags.get("closed"));
    let notices: Vec<String> = engine.drain_notices().iter().map(ToString::to_string).collect();
    assert_eq!(notices.len(), 4);
    assert!(!engine.is_completed("elsewhere"));
}

#[test]
fn runaway_recheck_is_halted_and_next_stimulus_gets_a_fresh_budget() {
    let (mut engine, mut world, _) = setup(4);
    engine.add_event(
        EventDefinition::new("tick", "Tick")
            .when(Condition::flag("tock", false))
            .then(Consequence::set_flag("tock", true)),
    );
    engine.add_event(
        EventDefinition::new("tock", "Tock")
            .when(Condition::flag("tock", true))
            .then(Consequence::set_flag("tock", false)),
    );

    let report = engine.evaluate("clocktower", &mut world.services());
    assert_eq!(report.outcome, PassOutcome::Halted { iterations: 4 });
    assert_eq!(report.fired.len(), 4);
    assert!(engine.active_event().is_none());

    let report = engine.evaluate("clocktower", &mut world.services());
    assert_eq!(report.outcome, PassOutcome::Halted { iterations: 4 });
    assert_eq!(report.fired.len(), 4);
}

#[test]
fn location_changes_during_dialogue_are_deferred() {
    let (mut engine, mut world, _) = setup(32);
    engine.add_dialogue(interview());
    engine.add_event(EventDefinition::new("interview", "Interview").at("office").once().with_dialogue("interview"));
    engine.add_event(EventDefinition::new("street", "Street Noise").at("street").once());

    engine.on_location_changed("office", &mut world.services());
    let report = engine.on_location_changed("street", &mut world.services());
    assert_eq!(report.outcome, PassOutcome::Deferred);
    assert!(report.fired.is_empty());
    assert_eq!(engine.current_location(), Some("office"));

    let report = engine.choose(2, &mut world.services()).expect("leave");
    assert_eq!(report.fired, vec!["street"]);
    assert_eq!(engine.current_location(), Some("street"));
    assert!(engine.is_completed("interview"));
}

#[test]
fn conditions_read_stats_time_and_relationships() {
    let (mut engine, mut world, _) = setup(32);
    engine.add_event(
        EventDefinition::new("night_shift", "Night Shift")
            .once()
            .manual()
            .when(Condition::new(ConditionKind::TimeWindow {
                start_hour: 22,
                end_hour: 4,
            }))
            .when(Condition::new(ConditionKind::StatCompare {
                character: Some("kit".into()),
                stat: Some("nerve".into()),
                op: Comparison::GreaterOrEqual,
                value: 5,
            }))
            .when(Condition::negated(ConditionKind::RelationshipTierAtLeast {
                from: Some("oren".into()),
                to: Some("kit".into()),
                tier: Some("Friend".into()),
            })),
    );

    assert!(engine.select("depot", &world.services()).is_none());
    world.clock.set(1, 23);
    assert_eq!(engine.select("depot", &world.services()).map(|e| e.id.as_str()), Some("night_shift"));
    world.clock.set(2, 2);
    assert!(engine.select("depot", &world.services()).is_some());

    world.stats.modify("kit", "nerve", -1).expect("nerve defined");
    assert!(engine.select("depot", &world.services()).is_none());
}

#[test]
fn broken_consequences_are_skipped_without_losing_the_rest() {
    let (mut engine, mut world, _) = setup(32);
    engine.add_event(
        EventDefinition::new("audit", "Audit")
            .once()
            .then(Consequence::new(ConsequenceKind::ModifyStat {
                character: Some("ghost".into()),
                stat: Some("nerve".into()),
                delta: 1,
            }))
            .then(Consequence::set_flag("audited", true)),
    );
    let report = engine.evaluate("office", &mut world.services());
    assert_eq!(report.fired, vec!["audit"]);
    assert!(world.flags.get("audited"));
}

#[test]
fn completion_set_survives_snapshot_and_restore() {
    let (mut engine, mut world, _) = setup(32);
    engine.add_event(EventDefinition::new("intro", "Intro").once());
    engine.evaluate("anywhere", &mut world.services());
    let saved = engine.snapshot_completed();
    assert_eq!(saved, HashSet::from(["intro".to_string()]));

    let (mut fresh, mut world, _) = setup(32);
    fresh.add_event(EventDefinition::new("intro", "Intro").once());
    fresh.restore_completed(saved);
    assert!(fresh.evaluate("anywhere", &mut world.services()).fired.is_empty());
}
