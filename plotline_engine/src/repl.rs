//! REPL and command handling.
//!
//! The demo runs a read-eval-print loop over a [`Session`]: the player's
//! commands move them around, advance conversations and let time pass, and
//! every change is fed to the [`EventEngine`]. Output is queued on a shared
//! [`View`] and flushed once per turn.

mod input;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use log::info;

use crate::command::{Command, HELP, parse_command};
use crate::config::PlotlineConfig;
use crate::dialogue::DialogueRunner;
use crate::engine::{EngineError, EngineNotice, EventEngine, PassOutcome, PassReport};
use crate::loader::Story;
use crate::services::{ClockService, LocationService, RelationshipService};
use crate::style::StoryStyle;
use crate::view::{ConsolePresenter, EventLine, View, ViewItem};
use crate::world::PlotWorld;

use input::{InputEvent, InputManager};

/// Control flow signal used by handlers to exit the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplControl {
    Continue,
    Quit,
}

/// Everything one play-through needs: the story, its world state, the engine
/// and the view the console presenter writes to.
pub struct Session {
    pub story: Story,
    pub world: PlotWorld,
    pub engine: EventEngine,
    pub view: Rc<RefCell<View>>,
}

impl Session {
    /// Build a world and engine from `config` and install `story` into them.
    pub fn new(story: Story, config: &PlotlineConfig) -> Self {
        let view = Rc::new(RefCell::new(View::new()));
        let runner = DialogueRunner::new(Box::new(ConsolePresenter::new(view.clone())));
        let mut engine = EventEngine::new(config.engine.clone()).with_runner(runner);
        let mut world = PlotWorld::new(config);
        story.install(&mut world, &mut engine);
        Self {
            story,
            world,
            engine,
            view,
        }
    }

    fn push(&self, item: ViewItem) {
        self.view.borrow_mut().push(item);
    }

    /// Show the opening scene and run the first pass at the start location.
    pub fn begin(&mut self) {
        let locations = self.world.location.clone();
        if let Some(location) = locations.current_location() {
            self.show_scene(&location);
        }
        let report = self.engine.sync_location(&locations, &mut self.world.services());
        self.report(&report);
    }

    /// Run a single command and report whether the loop should keep going.
    pub fn execute(&mut self, command: Command) -> ReplControl {
        match command {
            Command::Go(place) => self.go(&place),
            Command::Continue => self.continue_dialogue(),
            Command::Choose(number) => self.choose(number),
            Command::Wait(hours) => self.wait(hours),
            Command::Trigger(event_id) => self.trigger(&event_id),
            Command::Events => self.list_events(),
            Command::Flags => self.list_flags(),
            Command::Status => self.status(),
            Command::Help => self.push(ViewItem::Help(HELP.to_vec())),
            Command::Quit => {
                self.push(ViewItem::EngineMessage("Until next time.".to_string()));
                return ReplControl::Quit;
            },
            Command::Unknown(text) => self.push(ViewItem::Error(format!("Didn't quite catch \"{text}\". Try 'help'."))),
        }
        self.collect_notices();
        ReplControl::Continue
    }

    fn in_dialogue(&self) -> bool {
        self.engine.runner().is_some_and(DialogueRunner::is_running)
    }

    fn show_scene(&self, location: &str) {
        let (name, description) = self
            .story
            .place(location)
            .map_or_else(|| (location.to_string(), String::new()), |p| (p.name.clone(), p.desc.clone()));
        self.push(ViewItem::Scene { name, description });
    }

    fn go(&mut self, place: &str) {
        if self.story.place(place).is_none() {
            self.push(ViewItem::Error(format!("There's no place called '{place}'.")));
            return;
        }
        if !self.world.location.move_to(place) {
            self.push(ViewItem::EngineMessage("You're already there.".to_string()));
            return;
        }
        info!("player moved to '{place}'");
        self.show_scene(place);
        let report = self.engine.on_location_changed(place, &mut self.world.services());
        if report.outcome == PassOutcome::Deferred {
            self.push(ViewItem::EngineMessage(
                "The conversation isn't over yet; the new place will have to wait.".to_string(),
            ));
        }
        self.report(&report);
    }

    fn continue_dialogue(&mut self) {
        if !self.in_dialogue() {
            self.push(ViewItem::EngineMessage("Nobody is talking to you.".to_string()));
            return;
        }
        let result = self.engine.continue_dialogue(&mut self.world.services());
        self.handle(result);
    }

    fn choose(&mut self, number: usize) {
        let Some(index) = number.checked_sub(1) else {
            self.push(ViewItem::Error("Choices are numbered from 1.".to_string()));
            return;
        };
        let result = self.engine.choose(index, &mut self.world.services());
        self.handle(result);
    }

    fn wait(&mut self, hours: u32) {
        if self.in_dialogue() {
            self.push(ViewItem::EngineMessage("Finish the conversation first.".to_string()));
            return;
        }
        self.world.clock.advance_hours(hours);
        self.push(ViewItem::EngineMessage(format!(
            "Time passes... it is now day {}, {:02}:00.",
            self.world.clock.current_day(),
            self.world.clock.current_hour()
        )));
        if let Some(location) = self.engine.current_location().map(str::to_string) {
            let report = self.engine.evaluate(&location, &mut self.world.services());
            self.report(&report);
        }
    }

    fn trigger(&mut self, event_id: &str) {
        let result = self.engine.trigger(event_id, &mut self.world.services());
        self.handle(result);
    }

    fn handle(&mut self, result: Result<PassReport, EngineError>) {
        match result {
            Ok(report) => self.report(&report),
            Err(err) => self.push(ViewItem::Error(err.to_string())),
        }
    }

    fn report(&self, report: &PassReport) {
        match &report.outcome {
            PassOutcome::Held { event_id } => {
                let name = self.engine.event(event_id).map_or(event_id.as_str(), |e| e.name.as_str());
                self.push(ViewItem::EngineMessage(format!(
                    "{name} could happen here ('trigger {event_id}')."
                )));
            },
            PassOutcome::Halted { iterations } => self.push(ViewItem::Error(format!(
                "Story events stopped after {iterations} in a row; check the story for a loop."
            ))),
            PassOutcome::Idle | PassOutcome::AwaitingDialogue { .. } | PassOutcome::Deferred => {},
        }
    }

    fn collect_notices(&mut self) {
        for notice in self.engine.drain_notices() {
            let item = match notice {
                EngineNotice::EventTriggered { name, .. } => ViewItem::EventTriggered(name),
                EngineNotice::EventCompleted { event_id } => {
                    let name = self
                        .engine
                        .event(&event_id)
                        .map_or(event_id.clone(), |e| e.name.clone());
                    ViewItem::EventCompleted(name)
                },
                notice @ EngineNotice::RecheckHalted { .. } => ViewItem::EngineMessage(notice.to_string()),
            };
            self.push(item);
        }
    }

    fn list_events(&mut self) {
        let location = self.engine.current_location().unwrap_or_default().to_string();
        let active = self.engine.active_event().map(|e| e.id.clone());
        let services = self.world.services();
        let eligible: Vec<String> = self
            .engine
            .eligible(&location, &services)
            .iter()
            .map(|e| e.id.clone())
            .collect();
        let lines = self
            .engine
            .events()
            .iter()
            .map(|event| {
                let status = if active.as_deref() == Some(event.id.as_str()) {
                    "active"
                } else if event.one_time && self.engine.is_completed(&event.id) {
                    "completed"
                } else if eligible.contains(&event.id) {
                    if event.auto_trigger { "eligible" } else { "eligible (manual)" }
                } else {
                    "waiting"
                };
                EventLine {
                    id: event.id.clone(),
                    name: event.name.clone(),
                    location: event.required_location.clone(),
                    status,
                }
            })
            .collect();
        self.push(ViewItem::EventList(lines));
    }

    fn list_flags(&mut self) {
        let flags = self.world.flags.iter().map(|(k, v)| (k.to_string(), v)).collect();
        self.push(ViewItem::FlagList(flags));
    }

    fn status(&mut self) {
        let location = self.engine.current_location().unwrap_or("nowhere");
        let location = self.story.place(location).map_or(location, |p| p.name.as_str()).to_string();
        let mut details = Vec::new();
        if let Some(player) = self.world.roster.player() {
            for (def, value) in self.world.stats.values_for(player) {
                details.push(format!("{}: {value}", def.name));
            }
            for (id, name) in self.world.roster.iter().filter(|(id, _)| *id != player) {
                let tier = self
                    .world
                    .relationships
                    .current_tier(id, player)
                    .unwrap_or_else(|| "?".to_string());
                details.push(format!(
                    "{name} feels {tier} toward you ({})",
                    self.world.relationships.score(id, player)
                ));
            }
        }
        self.push(ViewItem::Status {
            location,
            day: self.world.clock.current_day(),
            hour: self.world.clock.current_hour(),
            period: self.world.clock.current_period().to_string(),
            details,
        });
    }

    fn prompt(&self) -> String {
        let hint = match self.engine.runner().map(DialogueRunner::state) {
            Some(state) if state.is_presenting_linear() => " (enter to continue)",
            Some(state) if state.is_presenting_choices() => " (choose a number)",
            _ => "",
        };
        let place = self.engine.current_location().unwrap_or("nowhere");
        format!(
            "\n[Day {} {:02}:00|{place}]{}>> ",
            self.world.clock.current_day(),
            self.world.clock.current_hour(),
            hint.prompt_hint_style()
        )
    }

    /// Ids offered for tab completion.
    fn completion_terms(&self) -> Vec<String> {
        self.story
            .places
            .iter()
            .map(|p| p.id.clone())
            .chain(self.story.events.iter().map(|e| e.id.clone()))
            .collect()
    }
}

/// Run the read-eval-print loop until the player quits or input ends.
///
/// # Errors
/// Currently always returns `Ok`; input failures are reported in the view and retried.
pub fn run_repl(session: &mut Session) -> Result<()> {
    let mut input = InputManager::new();
    input.set_story_terms(session.completion_terms());

    session.begin();
    session.collect_notices();
    session.view.borrow_mut().flush();

    loop {
        let prompt = session.prompt();
        let event = match input.read_line(&prompt) {
            Ok(event) => event,
            Err(err) => {
                session.push(ViewItem::Error(format!("Failed to read input ({err}). Try again.")));
                session.view.borrow_mut().flush();
                continue;
            },
        };
        let line = match event {
            InputEvent::Line(line) => line,
            InputEvent::Eof => "quit".to_string(),
            InputEvent::Interrupted => {
                session.push(ViewItem::EngineMessage("Command canceled.".to_string()));
                session.view.borrow_mut().flush();
                continue;
            },
        };

        let control = session.execute(parse_command(&line));
        session.view.borrow_mut().flush();
        if control == ReplControl::Quit {
            break;
        }
    }
    Ok(())
}
