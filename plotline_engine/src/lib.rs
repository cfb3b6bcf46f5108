#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const PLOTLINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod config;
pub mod dialogue;
pub mod engine;
pub mod event;
pub mod services;
pub mod world;

// Loading and the demo front end
pub mod command;
pub mod data_paths;
pub mod loader;
pub mod repl;
pub mod style;
pub mod view;

// Re-exports for convenience
pub use config::{EngineConfig, PlotlineConfig, load_config};
pub use dialogue::{DialogueGraph, DialogueNode, DialogueRunner};
pub use engine::{EngineNotice, EventEngine, PassOutcome, PassReport};
pub use event::{Condition, Consequence, EventDefinition};
pub use loader::{Story, load_story};
pub use repl::{Session, run_repl};
pub use services::{Presenter, Services};
pub use world::PlotWorld;
