//! Dialogue traversal.
//!
//! [`DialogueRunner`] walks a [`DialogueGraph`] one node at a time and hands
//! everything visible to its [`Presenter`]. It only moves in response to
//! player input (`advance` for linear nodes, `select_choice` for branching
//! ones) and reports the end of a conversation through [`RunnerStep::Ended`].

use std::rc::Rc;

use log::{error, info, warn};
use thiserror::Error;
use variantly::Variantly;

use super::{DialogueGraph, DialogueNode};
use crate::services::{Presenter, RelationshipService};

/// Where the runner is in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum RunnerState {
    Idle,
    /// Showing a node without choices; waiting for "continue".
    PresentingLinear(String),
    /// Showing a node's choices; waiting for a selection.
    PresentingChoices(String),
    Ended,
}

/// Signal raised when traversal reaches the end of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueEnded {
    pub graph_id: String,
}

/// Result of feeding the runner a start/continue/choice signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerStep {
    Waiting,
    Ended(DialogueEnded),
}

/// Problems reported by the runner. None of them change its state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    #[error("dialogue '{0}' has no nodes")]
    EmptyGraph(String),
    #[error("dialogue '{0}' is already running")]
    Busy(String),
    #[error("choice {index} is not available at node '{node}'")]
    InvalidChoice { index: usize, node: String },
    #[error("no dialogue is waiting for {0}")]
    NotWaiting(&'static str),
}

/// Single-occupancy dialogue state machine.
pub struct DialogueRunner {
    presenter: Box<dyn Presenter>,
    graph: Option<Rc<DialogueGraph>>,
    state: RunnerState,
}

impl DialogueRunner {
    pub fn new(presenter: Box<dyn Presenter>) -> Self {
        Self {
            presenter,
            graph: None,
            state: RunnerState::Idle,
        }
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    /// True while a conversation is waiting for player input.
    pub fn is_running(&self) -> bool {
        self.state.is_presenting_linear() || self.state.is_presenting_choices()
    }

    /// Id of the graph being played, if any.
    pub fn graph_id(&self) -> Option<&str> {
        self.graph.as_deref().map(|g| g.id.as_str())
    }

    /// The node currently on screen.
    pub fn current_node(&self) -> Option<&DialogueNode> {
        let id = match &self.state {
            RunnerState::PresentingLinear(id) | RunnerState::PresentingChoices(id) => id,
            _ => return None,
        };
        self.graph.as_deref().and_then(|g| g.node(id))
    }

    /// Begin a conversation.
    ///
    /// The start node is `start_id` if it resolves, else the graph's declared
    /// start, else its first node.
    ///
    /// # Errors
    /// - `Busy` if another conversation is still running
    /// - `EmptyGraph` if the graph has no nodes
    pub fn start(
        &mut self,
        graph: Rc<DialogueGraph>,
        start_id: Option<&str>,
        relationships: &mut dyn RelationshipService,
    ) -> Result<RunnerStep, DialogueError> {
        if self.is_running() {
            let current = self.graph_id().unwrap_or_default().to_string();
            warn!("refusing to start dialogue '{}': '{current}' is still running", graph.id);
            return Err(DialogueError::Busy(current));
        }
        if graph.is_empty() {
            error!("dialogue '{}' has no nodes", graph.id);
            return Err(DialogueError::EmptyGraph(graph.id.clone()));
        }

        let start = resolve_start(&graph, start_id);
        info!("dialogue '{}' started at node {:?}", graph.id, start);
        self.graph = Some(graph);
        Ok(self.enter(start, relationships))
    }

    /// "Continue" signal for a linear node.
    ///
    /// # Errors
    /// - `NotWaiting` if the current node is not linear (or nothing is running)
    pub fn advance(&mut self, relationships: &mut dyn RelationshipService) -> Result<RunnerStep, DialogueError> {
        let RunnerState::PresentingLinear(node_id) = &self.state else {
            warn!("continue ignored: runner is {:?}", self.state);
            return Err(DialogueError::NotWaiting("continue"));
        };
        let next = self
            .graph
            .as_deref()
            .and_then(|g| g.node(node_id))
            .and_then(|n| n.next.clone());
        Ok(self.enter(next, relationships))
    }

    /// Select a choice by its index in the current node's choice list.
    ///
    /// # Errors
    /// - `NotWaiting` if the current node is not showing choices
    /// - `InvalidChoice` if `index` is out of range or gated by a tier requirement
    pub fn select_choice(
        &mut self,
        index: usize,
        relationships: &mut dyn RelationshipService,
    ) -> Result<RunnerStep, DialogueError> {
        let RunnerState::PresentingChoices(node_id) = &self.state else {
            warn!("choice {index} ignored: runner is {:?}", self.state);
            return Err(DialogueError::NotWaiting("a choice"));
        };
        let node_id = node_id.clone();
        let Some(graph) = self.graph.clone() else {
            return Ok(self.finish());
        };
        let choice = graph
            .node(&node_id)
            .and_then(|node| node.choices.get(index))
            .filter(|choice| choice.is_available(&*relationships));
        let Some(choice) = choice else {
            warn!("invalid choice {index} at node '{node_id}' of dialogue '{}'", graph.id);
            return Err(DialogueError::InvalidChoice { index, node: node_id });
        };

        info!("choice {index} (\"{}\") selected at node '{node_id}'", choice.text);
        self.presenter.hide_choices();
        for delta in &choice.relationship_changes {
            delta.apply(relationships);
        }
        Ok(self.enter(choice.target.clone(), relationships))
    }

    fn enter(&mut self, target: Option<String>, relationships: &mut dyn RelationshipService) -> RunnerStep {
        let Some(graph) = self.graph.clone() else {
            return self.finish();
        };
        let Some(target) = target else {
            return self.finish();
        };
        let Some(node) = graph.node(&target) else {
            warn!("dialogue '{}': node '{target}' not found, ending dialogue", graph.id);
            return self.finish();
        };

        for delta in &node.relationship_changes {
            delta.apply(relationships);
        }
        self.presenter.present_node(node);

        let available = node.available_choices(&*relationships);
        if available.is_empty() {
            if !node.choices.is_empty() {
                warn!(
                    "dialogue '{}': every choice at node '{}' is gated, treating it as linear",
                    graph.id, node.id
                );
            }
            self.state = RunnerState::PresentingLinear(node.id.clone());
        } else {
            self.presenter.show_choices(&available);
            self.state = RunnerState::PresentingChoices(node.id.clone());
        }
        RunnerStep::Waiting
    }

    fn finish(&mut self) -> RunnerStep {
        self.presenter.hide_choices();
        self.presenter.on_dialogue_end();
        self.state = RunnerState::Ended;
        let graph_id = self.graph.take().map(|g| g.id.clone()).unwrap_or_default();
        info!("dialogue '{graph_id}' ended");
        RunnerStep::Ended(DialogueEnded { graph_id })
    }
}

fn resolve_start(graph: &DialogueGraph, explicit: Option<&str>) -> Option<String> {
    for id in explicit.into_iter().chain(graph.start.as_deref()) {
        if graph.node(id).is_some() {
            return Some(id.to_string());
        }
        warn!("dialogue '{}': start node '{id}' not found, falling back", graph.id);
    }
    graph.first().map(|n| n.id.clone())
}
