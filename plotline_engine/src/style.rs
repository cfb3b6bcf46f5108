//! Styling helpers for terminal output.
//!
//! The [`StoryStyle`] trait provides convenience methods for applying ANSI
//! styling via the `colored` crate. Implementations for `&str` and `String`
//! are provided so string literals can be styled directly.

use colored::{ColoredString, Colorize};
use textwrap::{Options, termwidth};

/// Convenience trait for applying color and style to text output.
pub trait StoryStyle {
    fn speaker_style(&self) -> ColoredString;
    fn dialogue_style(&self) -> ColoredString;
    fn choice_style(&self) -> ColoredString;
    fn choice_number_style(&self) -> ColoredString;
    fn location_style(&self) -> ColoredString;
    fn description_style(&self) -> ColoredString;
    fn event_style(&self) -> ColoredString;
    fn notice_style(&self) -> ColoredString;
    fn prompt_hint_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
    fn section_style(&self) -> ColoredString;
}

impl StoryStyle for &str {
    fn speaker_style(&self) -> ColoredString {
        self.bold().truecolor(13, 160, 80)
    }
    fn dialogue_style(&self) -> ColoredString {
        self.truecolor(230, 230, 210)
    }
    fn choice_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn choice_number_style(&self) -> ColoredString {
        self.bold().truecolor(230, 80, 80)
    }
    fn location_style(&self) -> ColoredString {
        self.truecolor(223, 77, 10).underline()
    }
    fn description_style(&self) -> ColoredString {
        self.italic().truecolor(102, 208, 250)
    }
    fn event_style(&self) -> ColoredString {
        self.italic().truecolor(230, 230, 30)
    }
    fn notice_style(&self) -> ColoredString {
        self.dimmed().truecolor(150, 230, 30)
    }
    fn prompt_hint_style(&self) -> ColoredString {
        self.dimmed().italic()
    }
    fn error_style(&self) -> ColoredString {
        self.truecolor(230, 30, 30)
    }
    fn section_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
}

impl StoryStyle for String {
    fn speaker_style(&self) -> ColoredString {
        self.as_str().speaker_style()
    }
    fn dialogue_style(&self) -> ColoredString {
        self.as_str().dialogue_style()
    }
    fn choice_style(&self) -> ColoredString {
        self.as_str().choice_style()
    }
    fn choice_number_style(&self) -> ColoredString {
        self.as_str().choice_number_style()
    }
    fn location_style(&self) -> ColoredString {
        self.as_str().location_style()
    }
    fn description_style(&self) -> ColoredString {
        self.as_str().description_style()
    }
    fn event_style(&self) -> ColoredString {
        self.as_str().event_style()
    }
    fn notice_style(&self) -> ColoredString {
        self.as_str().notice_style()
    }
    fn prompt_hint_style(&self) -> ColoredString {
        self.as_str().prompt_hint_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
    fn section_style(&self) -> ColoredString {
        self.as_str().section_style()
    }
}

/// Wrapping options for ordinary paragraphs at the current terminal width.
pub fn normal_block() -> Options<'static> {
    Options::new(termwidth().min(100))
}

/// Wrapping options for dialogue lines and lists, indented under a heading.
pub fn indented_block() -> Options<'static> {
    normal_block().initial_indent("    ").subsequent_indent("    ")
}
