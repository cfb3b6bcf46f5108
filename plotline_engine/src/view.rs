//! View module.
//!
//! Rather than printing from the presenter and each REPL handler, output is
//! aggregated into [`ViewItem`]s and displayed in one go at the end of the
//! turn. [`ConsolePresenter`] is the dialogue [`Presenter`] that feeds it.

use std::cell::RefCell;
use std::rc::Rc;

use colored::Colorize;
use log::debug;
use textwrap::{fill, termwidth};
use variantly::Variantly;

use crate::dialogue::{AvailableChoice, DialogueNode};
use crate::services::Presenter;
use crate::style::{StoryStyle, indented_block, normal_block};

const ICON_EVENT: &str = "⚡︎"; // U+26A1 U+FE0E
const ICON_DONE: &str = "\u{2611}";
const ICON_ERROR: &str = "⚠︎"; // U+26A0 U+FE0E
const ICON_ENGINE: &str = "⚙";

/// Top-level output sections, displayed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Scene,
    Story,
    Dialogue,
    System,
}

/// One line of a numbered choice menu. `number` is what the player types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceLine {
    pub number: usize,
    pub text: String,
}

/// Row data for the `events` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub status: &'static str,
}

/// Everything the console may be asked to show.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum ViewItem {
    Scene {
        name: String,
        description: String,
    },
    EventTriggered(String),
    EventCompleted(String),
    Speech {
        speaker: String,
        text: String,
    },
    Narration(String),
    Choices(Vec<ChoiceLine>),
    DialogueEnded,
    EngineMessage(String),
    Error(String),
    FlagList(Vec<(String, bool)>),
    EventList(Vec<EventLine>),
    Status {
        location: String,
        day: u32,
        hour: u8,
        period: String,
        details: Vec<String>,
    },
    Help(Vec<(&'static str, &'static str)>),
}

impl ViewItem {
    /// Classify a view item into a top-level output section.
    pub fn section(&self) -> Section {
        match self {
            ViewItem::Scene { .. } => Section::Scene,
            ViewItem::EventTriggered(_) | ViewItem::EventCompleted(_) => Section::Story,
            ViewItem::Speech { .. } | ViewItem::Narration(_) | ViewItem::Choices(_) | ViewItem::DialogueEnded => {
                Section::Dialogue
            },
            ViewItem::EngineMessage(_)
            | ViewItem::Error(_)
            | ViewItem::FlagList(_)
            | ViewItem::EventList(_)
            | ViewItem::Status { .. }
            | ViewItem::Help(_) => Section::System,
        }
    }
}

/// Aggregates view items for one turn.
#[derive(Debug, Clone, Default)]
pub struct View {
    items: Vec<ViewItem>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ViewItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[ViewItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything queued for this turn without displaying it.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Items in display order: by section, then in the order they were pushed.
    pub fn ordered(&self) -> Vec<&ViewItem> {
        let mut ordered: Vec<&ViewItem> = self.items.iter().collect();
        ordered.sort_by_key(|item| item.section());
        ordered
    }

    /// Compose and display all queued items, then clear the queue.
    pub fn flush(&mut self) {
        let width = termwidth();
        let mut last_section = None;
        for item in self.ordered() {
            let section = item.section();
            if last_section != Some(section) && section == Section::Dialogue {
                println!("{:.>width$}", "dialogue".section_style());
            }
            last_section = Some(section);
            render(item);
        }
        self.reset();
    }
}

fn render(item: &ViewItem) {
    match item {
        ViewItem::Scene { name, description } => {
            println!("\n{}", name.location_style());
            if !description.is_empty() {
                println!("{}", fill(description, normal_block()).description_style());
            }
        },
        ViewItem::EventTriggered(name) => {
            println!("{} {}", ICON_EVENT.choice_number_style(), name.event_style());
        },
        ViewItem::EventCompleted(name) => println!("{} {}", ICON_DONE, name.notice_style()),
        ViewItem::Speech { speaker, text } => {
            println!("{}", speaker.speaker_style());
            println!("{}", fill(text, indented_block()).dialogue_style());
        },
        ViewItem::Narration(text) => println!("{}", fill(text, normal_block()).description_style()),
        ViewItem::Choices(lines) => {
            for line in lines {
                println!(
                    "    {}) {}",
                    line.number.to_string().choice_number_style(),
                    line.text.choice_style()
                );
            }
        },
        ViewItem::DialogueEnded => println!("{}", "(end of conversation)".prompt_hint_style()),
        ViewItem::EngineMessage(msg) => println!("{ICON_ENGINE} {}", msg.notice_style()),
        ViewItem::Error(msg) => println!("{} {}", ICON_ERROR.error_style(), msg.error_style()),
        ViewItem::FlagList(flags) => {
            if flags.is_empty() {
                println!("{}", "No flags have been set.".prompt_hint_style());
            }
            for (flag, value) in flags {
                let value = if *value { "true".green() } else { "false".red() };
                println!("    {flag}: {value}");
            }
        },
        ViewItem::EventList(events) => {
            for event in events {
                let location = event.location.as_deref().unwrap_or("anywhere");
                println!(
                    "    {} {} ({location}) {}",
                    event.id.as_str().choice_style(),
                    event.name,
                    event.status.prompt_hint_style()
                );
            }
        },
        ViewItem::Status {
            location,
            day,
            hour,
            period,
            details,
        } => {
            println!("{} {}", "Location:".bold(), location.location_style());
            println!("{} day {day}, {hour:02}:00 ({period})", "Time:".bold());
            for line in details {
                println!("    {line}");
            }
        },
        ViewItem::Help(commands) => {
            for (command, description) in commands {
                println!("    {:<18} {}", command.choice_style(), description);
            }
        },
    }
}

/// Dialogue presenter that queues output on a shared [`View`].
pub struct ConsolePresenter {
    view: Rc<RefCell<View>>,
}

impl ConsolePresenter {
    pub fn new(view: Rc<RefCell<View>>) -> Self {
        Self { view }
    }
}

impl Presenter for ConsolePresenter {
    fn present_node(&mut self, node: &DialogueNode) {
        let speaker = if node.display_name.is_empty() {
            node.speaker.clone()
        } else {
            Some(node.display_name.clone())
        };
        let item = match speaker {
            Some(speaker) => ViewItem::Speech {
                speaker,
                text: node.text.clone(),
            },
            None => ViewItem::Narration(node.text.clone()),
        };
        self.view.borrow_mut().push(item);
    }

    fn show_choices(&mut self, choices: &[AvailableChoice<'_>]) {
        let lines = choices
            .iter()
            .map(|c| ChoiceLine {
                number: c.index + 1,
                text: c.choice.text.clone(),
            })
            .collect();
        self.view.borrow_mut().push(ViewItem::Choices(lines));
    }

    fn hide_choices(&mut self) {
        debug!("choices withdrawn");
    }

    fn on_dialogue_end(&mut self) {
        self.view.borrow_mut().push(ViewItem::DialogueEnded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationshipConfig;
    use crate::dialogue::DialogueChoice;
    use crate::world::RelationshipStore;

    #[test]
    fn ordered_groups_by_section_and_keeps_push_order() {
        let mut view = View::new();
        view.push(ViewItem::EngineMessage("system".into()));
        view.push(ViewItem::Narration("first".into()));
        view.push(ViewItem::EventTriggered("Bell".into()));
        view.push(ViewItem::Narration("second".into()));

        let ordered: Vec<&str> = view
            .ordered()
            .iter()
            .map(|item| match item {
                ViewItem::EventTriggered(_) => "event",
                ViewItem::Narration(text) => text.as_str(),
                ViewItem::EngineMessage(_) => "system",
                other => panic!("Unexpected ViewItem in results: {other:?}"),
            })
            .collect();
        assert_eq!(ordered, vec!["event", "first", "second", "system"]);
    }

    #[test]
    fn presenter_prefers_display_name_and_numbers_from_one() {
        let view = Rc::new(RefCell::new(View::new()));
        let mut presenter = ConsolePresenter::new(view.clone());
        let rel = RelationshipStore::new(RelationshipConfig::default());

        let node = DialogueNode::new("n0", "Evening.")
            .spoken_by("mira", "Mira the Ferrywoman")
            .with_choice(DialogueChoice::new("Hello", None))
            .with_choice(DialogueChoice::new("Goodbye", None));
        presenter.present_node(&node);
        presenter.show_choices(&node.available_choices(&rel));
        presenter.present_node(&DialogueNode::new("n1", "The tide turns."));
        presenter.on_dialogue_end();

        let view = view.borrow();
        assert_eq!(
            view.items()[0],
            ViewItem::Speech {
                speaker: "Mira the Ferrywoman".into(),
                text: "Evening.".into()
            }
        );
        assert_eq!(
            view.items()[1],
            ViewItem::Choices(vec![
                ChoiceLine {
                    number: 1,
                    text: "Hello".into()
                },
                ChoiceLine {
                    number: 2,
                    text: "Goodbye".into()
                },
            ])
        );
        assert!(view.items()[2].is_narration());
        assert!(view.items()[3].is_dialogue_ended());
    }
}
