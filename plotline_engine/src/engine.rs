//! Event evaluation and triggering.
//!
//! [`EventEngine`] owns the event definitions, the dialogue library, the set of
//! completed one-time events and the single [`DialogueRunner`]. A pass starts
//! from an external stimulus (`evaluate`, `on_location_changed`, `trigger`) and
//! runs an iterative loop:
//!
//! ```text
//! select -> trigger -> [dialogue suspends the pass] -> finalize -> select ...
//! ```
//!
//! The loop stops when nothing auto-triggerable is eligible, when the winner
//! is held for manual triggering, when a dialogue is waiting for the player, or
//! when `max_rechecks` triggers have happened since the stimulus. A pass that
//! was suspended by a dialogue resumes from `continue_dialogue` / `choose`.
//!
//! While an event is active every new stimulus is deferred. A location change
//! that arrives mid-dialogue is parked and honored once the dialogue finishes.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::rc::Rc;

use log::{debug, error, info, warn};
use thiserror::Error;
use variantly::Variantly;

use crate::config::EngineConfig;
use crate::dialogue::{DialogueError, DialogueGraph, DialogueRunner, RunnerStep};
use crate::event::EventDefinition;
use crate::services::{LocationService, Services};

/// Problems reported by the engine's player-facing entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("event '{0}' is still active")]
    Busy(String),
    #[error("no dialogue runner is attached")]
    NoRunner,
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
}

/// Things that happened during a pass, for the host to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineNotice {
    EventTriggered { event_id: String, name: String },
    EventCompleted { event_id: String },
    RecheckHalted { location: String, iterations: usize },
}

impl Display for EngineNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineNotice::EventTriggered { name, .. } => write!(f, "event triggered: {name}"),
            EngineNotice::EventCompleted { event_id } => write!(f, "event completed: {event_id}"),
            EngineNotice::RecheckHalted { location, iterations } => {
                write!(f, "recheck halted at '{location}' after {iterations} triggers")
            },
        }
    }
}

/// How a pass came to rest.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum PassOutcome {
    /// Nothing eligible.
    Idle,
    /// The best eligible event is not auto-triggered.
    Held { event_id: String },
    /// A dialogue is waiting for player input.
    AwaitingDialogue { event_id: String },
    /// Another event is active; the stimulus was parked or ignored.
    Deferred,
    /// The trigger budget was exhausted.
    Halted { iterations: usize },
}

/// Result of one pass: the events fired (in order) and where the pass stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub fired: Vec<String>,
    pub outcome: PassOutcome,
}

impl PassReport {
    fn new(fired: Vec<String>, outcome: PassOutcome) -> Self {
        Self { fired, outcome }
    }
}

#[derive(Debug, Clone)]
struct ActiveEvent {
    index: usize,
    dialogue: Option<String>,
}

enum Fired {
    Completed,
    AwaitingDialogue,
}

/// Drives event selection, dialogue playback and consequence application.
pub struct EventEngine {
    config: EngineConfig,
    events: Vec<EventDefinition>,
    dialogues: HashMap<String, Rc<DialogueGraph>>,
    completed: HashSet<String>,
    runner: Option<DialogueRunner>,
    active: Option<ActiveEvent>,
    current_location: Option<String>,
    pending_location: Option<String>,
    triggers_this_pass: usize,
    notices: Vec<EngineNotice>,
}

impl EventEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            dialogues: HashMap::new(),
            completed: HashSet::new(),
            runner: None,
            active: None,
            current_location: None,
            pending_location: None,
            triggers_this_pass: 0,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: DialogueRunner) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Attach or detach the dialogue runner. Ignored while an event is active.
    pub fn set_runner(&mut self, runner: Option<DialogueRunner>) {
        if let Some(active) = self.active_event() {
            warn!("cannot swap dialogue runner while event '{}' is active", active.id);
            return;
        }
        self.runner = runner;
    }

    pub fn runner(&self) -> Option<&DialogueRunner> {
        self.runner.as_ref()
    }

    /// Register an event. Returns `false` (and keeps the original) if the id is taken.
    pub fn add_event(&mut self, event: EventDefinition) -> bool {
        if self.event(&event.id).is_some() {
            warn!("duplicate event id '{}' ignored", event.id);
            return false;
        }
        debug!("event '{}' registered", event.id);
        self.events.push(event);
        true
    }

    /// Register a dialogue graph, replacing any graph with the same id.
    pub fn add_dialogue(&mut self, graph: DialogueGraph) {
        let id = graph.id.clone();
        if self.dialogues.insert(id.clone(), Rc::new(graph)).is_some() {
            warn!("dialogue '{id}' replaced");
        }
    }

    pub fn events(&self) -> &[EventDefinition] {
        &self.events
    }

    pub fn event(&self, id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn dialogue(&self, id: &str) -> Option<&DialogueGraph> {
        self.dialogues.get(id).map(|graph| &**graph)
    }

    pub fn current_location(&self) -> Option<&str> {
        self.current_location.as_deref()
    }

    pub fn active_event(&self) -> Option<&EventDefinition> {
        self.active.as_ref().and_then(|a| self.events.get(a.index))
    }

    pub fn is_completed(&self, event_id: &str) -> bool {
        self.completed.contains(event_id)
    }

    pub fn snapshot_completed(&self) -> HashSet<String> {
        self.completed.clone()
    }

    pub fn restore_completed(&mut self, completed: HashSet<String>) {
        info!("restoring {} completed event(s)", completed.len());
        self.completed = completed;
    }

    pub fn drain_notices(&mut self) -> Vec<EngineNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Events that could fire at `location` right now, in declaration order.
    pub fn eligible(&self, location: &str, services: &Services<'_>) -> Vec<&EventDefinition> {
        self.events
            .iter()
            .filter(|event| self.is_eligible(event, location, services))
            .collect()
    }

    /// The event a pass at `location` would pick. Highest priority wins; the
    /// first declared wins a tie. Has no side effects.
    pub fn select(&self, location: &str, services: &Services<'_>) -> Option<&EventDefinition> {
        self.select_index(location, services).and_then(|idx| self.events.get(idx))
    }

    /// Run a pass at `location`.
    ///
    /// Each call is a fresh stimulus with a fresh trigger budget. If an event is
    /// active the location is parked until it completes.
    pub fn evaluate(&mut self, location: &str, services: &mut Services<'_>) -> PassReport {
        if let Some(active) = self.active_event() {
            info!(
                "event '{}' is active; evaluation at '{location}' deferred until it completes",
                active.id
            );
            self.pending_location = Some(location.to_string());
            return PassReport::new(Vec::new(), PassOutcome::Deferred);
        }
        self.current_location = Some(location.to_string());
        self.triggers_this_pass = 0;
        self.run_pass(Vec::new(), services)
    }

    /// Location-change notification from the host.
    pub fn on_location_changed(&mut self, location: &str, services: &mut Services<'_>) -> PassReport {
        info!("location changed to '{location}'");
        self.evaluate(location, services)
    }

    /// Evaluate wherever `locations` says the player is (startup, after a restore).
    pub fn sync_location(&mut self, locations: &dyn LocationService, services: &mut Services<'_>) -> PassReport {
        match locations.current_location() {
            Some(location) => self.on_location_changed(&location, services),
            None => {
                debug!("sync_location: player has no location");
                PassReport::new(Vec::new(), PassOutcome::Idle)
            },
        }
    }

    /// Fire an event by id, skipping eligibility checks. Starts a fresh
    /// trigger budget for the recheck that follows.
    ///
    /// # Errors
    /// - `Busy` if another event is active
    /// - `UnknownEvent` if no event has this id
    pub fn trigger(&mut self, event_id: &str, services: &mut Services<'_>) -> Result<PassReport, EngineError> {
        if let Some(active) = self.active_event() {
            return Err(EngineError::Busy(active.id.clone()));
        }
        let index = self
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or_else(|| EngineError::UnknownEvent(event_id.to_string()))?;
        let event = &self.events[index];
        if event.one_time && self.completed.contains(&event.id) {
            warn!("manually re-triggering completed one-time event '{event_id}'");
        }
        info!("manual trigger: '{event_id}'");

        self.triggers_this_pass = 1;
        match self.fire(index, services) {
            Fired::AwaitingDialogue => Ok(PassReport::new(
                vec![event_id.to_string()],
                PassOutcome::AwaitingDialogue {
                    event_id: event_id.to_string(),
                },
            )),
            Fired::Completed => Ok(self.run_pass(vec![event_id.to_string()], services)),
        }
    }

    /// "Continue" signal for the running dialogue.
    ///
    /// # Errors
    /// - `NoRunner` if no runner is attached
    /// - runner errors when the current node is not linear
    pub fn continue_dialogue(&mut self, services: &mut Services<'_>) -> Result<PassReport, EngineError> {
        let runner = self.runner.as_mut().ok_or(EngineError::NoRunner)?;
        let step = runner.advance(&mut *services.relationships)?;
        Ok(self.after_step(step, services))
    }

    /// Choice selection for the running dialogue.
    ///
    /// # Errors
    /// - `NoRunner` if no runner is attached
    /// - runner errors for gated or out-of-range choices
    pub fn choose(&mut self, index: usize, services: &mut Services<'_>) -> Result<PassReport, EngineError> {
        let runner = self.runner.as_mut().ok_or(EngineError::NoRunner)?;
        let step = runner.select_choice(index, &mut *services.relationships)?;
        Ok(self.after_step(step, services))
    }

    fn is_eligible(&self, event: &EventDefinition, location: &str, services: &Services<'_>) -> bool {
        if !event.matches_location(location) {
            return false;
        }
        if event.one_time && self.completed.contains(&event.id) {
            debug!("event '{}' already completed", event.id);
            return false;
        }
        event.conditions_pass(services)
    }

    fn select_index(&self, location: &str, services: &Services<'_>) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (idx, event) in self.events.iter().enumerate() {
            if !self.is_eligible(event, location, services) {
                continue;
            }
            if best.is_none_or(|(_, priority)| event.priority > priority) {
                best = Some((idx, event.priority));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// The recheck loop. Runs until the pass comes to rest.
    fn run_pass(&mut self, mut fired: Vec<String>, services: &mut Services<'_>) -> PassReport {
        loop {
            let Some(location) = self.current_location.clone() else {
                return PassReport::new(fired, PassOutcome::Idle);
            };
            let Some(index) = self.select_index(&location, services) else {
                debug!("no eligible event at '{location}'");
                return PassReport::new(fired, PassOutcome::Idle);
            };
            let event = &self.events[index];
            let event_id = event.id.clone();
            if !event.auto_trigger {
                info!("event '{event_id}' is eligible but waits for a manual trigger");
                return PassReport::new(fired, PassOutcome::Held { event_id });
            }
            if self.triggers_this_pass >= self.config.max_rechecks {
                let iterations = self.triggers_this_pass;
                error!(
                    "recheck loop at '{location}' hit the limit of {iterations} triggers; \
                     '{event_id}' was not fired and auto-triggering stops for this pass"
                );
                self.notices.push(EngineNotice::RecheckHalted { location, iterations });
                return PassReport::new(fired, PassOutcome::Halted { iterations });
            }

            self.triggers_this_pass += 1;
            fired.push(event_id.clone());
            match self.fire(index, services) {
                Fired::Completed => {},
                Fired::AwaitingDialogue => {
                    return PassReport::new(fired, PassOutcome::AwaitingDialogue { event_id });
                },
            }
        }
    }

    /// Mark the event active and either start its dialogue or finalize it.
    fn fire(&mut self, index: usize, services: &mut Services<'_>) -> Fired {
        let event = &self.events[index];
        info!("event '{}' (\"{}\") triggered", event.id, event.name);
        self.notices.push(EngineNotice::EventTriggered {
            event_id: event.id.clone(),
            name: event.name.clone(),
        });
        self.active = Some(ActiveEvent {
            index,
            dialogue: event.dialogue.clone(),
        });

        let Some(dialogue_id) = event.dialogue.as_deref() else {
            self.finalize(index, services);
            return Fired::Completed;
        };
        let Some(graph) = self.dialogues.get(dialogue_id).cloned() else {
            error!("event '{}': dialogue '{dialogue_id}' is not loaded", event.id);
            self.finalize(index, services);
            return Fired::Completed;
        };
        let Some(runner) = self.runner.as_mut() else {
            error!("event '{}' needs dialogue '{dialogue_id}' but no runner is attached", event.id);
            self.finalize(index, services);
            return Fired::Completed;
        };
        match runner.start(graph, None, &mut *services.relationships) {
            Ok(RunnerStep::Waiting) => Fired::AwaitingDialogue,
            Ok(RunnerStep::Ended(_)) => {
                self.finalize(index, services);
                Fired::Completed
            },
            Err(err) => {
                error!("event '{}': dialogue failed to start: {err}", event.id);
                self.finalize(index, services);
                Fired::Completed
            },
        }
    }

    /// Record completion, apply consequences in order and clear the active event.
    fn finalize(&mut self, index: usize, services: &mut Services<'_>) {
        let event = &self.events[index];
        if event.one_time {
            self.completed.insert(event.id.clone());
        }
        for (pos, consequence) in event.consequences.iter().enumerate() {
            if let Err(err) = consequence.apply(services) {
                error!("event '{}': consequence {pos} failed: {err}", event.id);
            }
        }
        self.active = None;
        info!("event '{}' completed", event.id);
        self.notices.push(EngineNotice::EventCompleted {
            event_id: event.id.clone(),
        });
    }

    fn after_step(&mut self, step: RunnerStep, services: &mut Services<'_>) -> PassReport {
        match step {
            RunnerStep::Waiting => {
                let outcome = match self.active_event() {
                    Some(event) => PassOutcome::AwaitingDialogue {
                        event_id: event.id.clone(),
                    },
                    None => PassOutcome::Idle,
                };
                PassReport::new(Vec::new(), outcome)
            },
            RunnerStep::Ended(ended) => {
                let Some(active) = self.active.clone() else {
                    warn!("dialogue '{}' ended with no active event", ended.graph_id);
                    return PassReport::new(Vec::new(), PassOutcome::Idle);
                };
                if active.dialogue.as_deref() != Some(ended.graph_id.as_str()) {
                    warn!("dialogue '{}' ended but the active event expected {:?}", ended.graph_id, active.dialogue);
                }
                self.finalize(active.index, services);
                if let Some(pending) = self.pending_location.take()
                    && self.current_location.as_deref() != Some(pending.as_str())
                {
                    info!("honoring deferred location change to '{pending}'");
                    self.current_location = Some(pending);
                    self.triggers_this_pass = 0;
                }
                self.run_pass(Vec::new(), services)
            },
        }
    }
}
