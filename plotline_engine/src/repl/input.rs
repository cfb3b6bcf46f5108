//! Terminal input handling for the Plotline REPL.
//!
//! Wraps rustyline configuration and tab completion for the command set and
//! the ids of the loaded story, with a plain stdin fallback when stdin is not
//! a terminal.

use std::cell::RefCell;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{info, warn};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// Outcome of reading a line from the REPL input.
pub enum InputEvent {
    Line(String),
    Eof,
    Interrupted,
}

const COMMAND_TERMS: &[&str] = &[
    "choose", "continue", "events", "flags", "go", "help", "quit", "status", "trigger", "wait",
];

type ReplEditor = rustyline::Editor<PlotlineHelper, DefaultHistory>;

/// Completion source: fixed command words plus story ids supplied at runtime.
#[derive(Default)]
struct PlotlineHelper {
    story_terms: Rc<RefCell<Vec<String>>>,
}

impl Helper for PlotlineHelper {}

impl Completer for PlotlineHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let (start, prefix) = current_word(line, pos);
        if prefix.is_empty() {
            return Ok((start, Vec::new()));
        }
        let story_terms = self.story_terms.borrow();
        let terms = if start == 0 {
            COMMAND_TERMS.iter().map(|t| (*t).to_string()).collect::<Vec<_>>()
        } else {
            story_terms.clone()
        };
        Ok((start, matching_pairs(&terms, &prefix)))
    }
}

impl Hinter for PlotlineHelper {
    type Hint = String;
}

impl Highlighter for PlotlineHelper {}

impl Validator for PlotlineHelper {}

/// Start index and text of the word under the cursor.
fn current_word(line: &str, pos: usize) -> (usize, String) {
    let slice = &line[..pos];
    let start = slice.rfind(char::is_whitespace).map_or(0, |idx| idx + 1);
    (start, slice[start..].to_string())
}

fn matching_pairs(terms: &[String], prefix: &str) -> Vec<Pair> {
    let lower = prefix.to_lowercase();
    let mut pairs: Vec<Pair> = terms
        .iter()
        .filter(|term| term.to_lowercase().starts_with(&lower))
        .map(|term| Pair {
            display: term.clone(),
            replacement: term.clone(),
        })
        .collect();
    pairs.sort_by(|a, b| a.display.cmp(&b.display));
    pairs.dedup_by(|a, b| a.display == b.display);
    pairs
}

/// Line reader for the REPL: a rustyline editor on a terminal, plain stdin otherwise.
pub struct InputManager {
    editor: Option<ReplEditor>,
    history: Option<PathBuf>,
    story_terms: Rc<RefCell<Vec<String>>>,
}

impl InputManager {
    pub fn new() -> Self {
        let story_terms = Rc::new(RefCell::new(Vec::new()));
        let mut editor = None;
        if io::stdin().is_terminal() {
            match ReplEditor::new() {
                Ok(mut ed) => {
                    ed.set_helper(Some(PlotlineHelper {
                        story_terms: story_terms.clone(),
                    }));
                    editor = Some(ed);
                },
                Err(err) => warn!("line editor unavailable ({err}); reading plain stdin"),
            }
        } else {
            info!("stdin is not a terminal; reading plain lines");
        }

        let mut input = Self {
            history: editor.as_ref().and_then(|_| history_file_path()),
            editor,
            story_terms,
        };
        input.load_history();
        input
    }

    /// Replace the story ids (locations, events) offered for completion.
    pub fn set_story_terms(&mut self, terms: Vec<String>) {
        *self.story_terms.borrow_mut() = terms;
    }

    pub fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        let Some(editor) = self.editor.as_mut() else {
            return read_plain_line(prompt);
        };
        let event = readline_event(editor.readline(prompt))?;
        if let InputEvent::Line(line) = &event {
            self.remember(line);
        }
        Ok(event)
    }

    fn load_history(&mut self) {
        let (Some(editor), Some(path)) = (self.editor.as_mut(), self.history.as_ref()) else {
            return;
        };
        if let Some(dir) = path.parent()
            && let Err(err) = fs::create_dir_all(dir)
        {
            warn!("cannot create history directory {}: {err}", dir.display());
        }
        match editor.load_history(path) {
            Ok(()) => info!("history loaded from {}", path.display()),
            Err(ReadlineError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => warn!("cannot load history from {}: {err}", path.display()),
        }
    }

    fn remember(&mut self, line: &str) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        if line.trim().is_empty() {
            return;
        }
        if let Err(err) = editor.add_history_entry(line) {
            warn!("cannot record history entry: {err}");
        }
        if let Some(path) = self.history.as_ref()
            && let Err(err) = editor.save_history(path)
        {
            warn!("cannot save history to {}: {err}", path.display());
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

fn readline_event(result: rustyline::Result<String>) -> io::Result<InputEvent> {
    match result {
        Ok(line) => Ok(InputEvent::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
        Err(ReadlineError::Eof) => Ok(InputEvent::Eof),
        Err(ReadlineError::Io(err)) => Err(err),
        Err(other) => Err(io::Error::other(other)),
    }
}

fn read_plain_line(prompt: &str) -> io::Result<InputEvent> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(InputEvent::Eof);
    }
    Ok(InputEvent::Line(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// `<data dir>/plotline/history.txt`, if the platform has a data directory.
fn history_file_path() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::data_local_dir)
        .map(|base| history_path_in(&base))
}

fn history_path_in(base: &Path) -> PathBuf {
    base.join("plotline").join("history.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readline_results_map_to_events() {
        assert!(matches!(readline_event(Err(ReadlineError::Interrupted)), Ok(InputEvent::Interrupted)));
        assert!(matches!(readline_event(Err(ReadlineError::Eof)), Ok(InputEvent::Eof)));
        assert!(matches!(readline_event(Ok("go docks".into())), Ok(InputEvent::Line(l)) if l == "go docks"));
    }

    #[test]
    fn history_path_appends_components() {
        let path = history_path_in(Path::new("/tmp/plotline-test"));
        assert!(path.ends_with(Path::new("plotline/history.txt")));
    }

    #[test]
    fn current_word_tracks_cursor() {
        assert_eq!(current_word("go squ", 6), (3, "squ".to_string()));
        assert_eq!(current_word("tri", 3), (0, "tri".to_string()));
    }

    #[test]
    fn completion_matches_prefix_case_insensitively() {
        let terms = vec!["square".to_string(), "Docks".to_string(), "squall".to_string()];
        let found: Vec<String> = matching_pairs(&terms, "SQ").into_iter().map(|p| p.display).collect();
        assert_eq!(found, vec!["squall", "square"]);
        assert_eq!(matching_pairs(&terms, "do")[0].replacement, "Docks");
    }
}
