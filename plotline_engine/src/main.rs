#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Plotline **
//! Console front end for the narrative event engine.

use plotline_engine::data_paths::{config_path, story_path};
use plotline_engine::style::{StoryStyle, normal_block};
use plotline_engine::{PLOTLINE_VERSION, Session, load_config, load_story, run_repl};

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;

use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();
    info!("Start: Plotline {PLOTLINE_VERSION}");

    let story_file = std::env::args().nth(1).map_or_else(story_path, PathBuf::from);
    let config = load_config(&config_path());
    let story = load_story(&story_file).with_context(|| format!("while loading story '{}'", story_file.display()))?;
    info!("story '{}' loaded successfully.", story.meta.title);

    // clear the screen
    print!("\x1B[2J\x1B[H");
    std::io::stdout().flush().context("while clearing the screen")?;

    println!("{:^84}", story.meta.title.to_uppercase().bright_yellow().underline());
    if !story.meta.author.is_empty() {
        println!("{:^84}", format!("by {}", story.meta.author).italic());
    }
    if !story.meta.intro.is_empty() {
        println!("\n{}", textwrap::fill(&story.meta.intro, normal_block()).description_style());
    }
    println!("\n{}", "Type 'help' for commands.".prompt_hint_style());

    let mut session = Session::new(story, &config);
    run_repl(&mut session)
}
