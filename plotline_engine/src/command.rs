//! Command module
//!
//! Describes the commands accepted by the demo REPL.
use variantly::Variantly;

/// Commands that can be entered at the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum Command {
    /// Move the player to a location id.
    Go(String),
    /// Advance a linear dialogue node. An empty line means the same.
    Continue,
    /// Pick a dialogue choice by its displayed (1-based) number.
    Choose(usize),
    /// Let in-game time pass, then re-evaluate the current location.
    Wait(u32),
    Trigger(String),
    Events,
    Flags,
    Status,
    Help,
    Quit,
    Unknown(String),
}

/// Parses an input line into a `Command`.
pub fn parse_command(input: &str) -> Command {
    let words: Vec<&str> = input.split_whitespace().collect();
    match words.as_slice() {
        [] | ["continue" | "c" | "next"] => Command::Continue,
        ["go" | "move" | "travel"] | ["go" | "move" | "travel", "to"] => Command::Unknown(input.trim().to_string()),
        ["go" | "move" | "travel", "to", place] | ["go" | "move" | "travel", place] => {
            Command::Go((*place).to_string())
        },
        ["choose" | "pick" | "say", number] | [number] if number.parse::<usize>().is_ok() => {
            number.parse().map_or_else(|_| Command::Unknown(input.trim().to_string()), Command::Choose)
        },
        ["wait"] => Command::Wait(1),
        ["wait", hours] | ["wait", hours, "hours" | "hour"] => hours
            .parse()
            .map_or_else(|_| Command::Unknown(input.trim().to_string()), Command::Wait),
        ["trigger" | "fire", event] => Command::Trigger((*event).to_string()),
        ["events"] => Command::Events,
        ["flags"] => Command::Flags,
        ["status" | "stats"] => Command::Status,
        ["help" | "?"] => Command::Help,
        ["quit" | "exit"] => Command::Quit,
        _ => Command::Unknown(input.trim().to_string()),
    }
}

/// Command summaries shown by `help`.
pub const HELP: &[(&str, &str)] = &[
    ("go <location>", "move to a location"),
    ("<enter>, continue", "advance the conversation"),
    ("<n>, choose <n>", "pick dialogue choice n"),
    ("wait [hours]", "let time pass"),
    ("trigger <event>", "fire an event by id"),
    ("events", "list events and their status"),
    ("flags", "show story flags"),
    ("status", "show location, time, stats and relationships"),
    ("help", "show this list"),
    ("quit", "leave the story"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_continues() {
        assert_eq!(parse_command(""), Command::Continue);
        assert_eq!(parse_command("   \n"), Command::Continue);
        assert_eq!(parse_command("continue"), Command::Continue);
    }

    #[test]
    fn numbers_choose() {
        assert_eq!(parse_command("2"), Command::Choose(2));
        assert_eq!(parse_command("choose 3"), Command::Choose(3));
        assert!(parse_command("choose x").is_unknown());
    }

    #[test]
    fn movement_and_time() {
        assert_eq!(parse_command("go to docks"), Command::Go("docks".into()));
        assert_eq!(parse_command("go square"), Command::Go("square".into()));
        assert_eq!(parse_command("go to"), Command::Unknown("go to".into()));
        assert!(parse_command("go").is_unknown());
        assert_eq!(parse_command("wait"), Command::Wait(1));
        assert_eq!(parse_command("wait 4 hours"), Command::Wait(4));
        assert!(parse_command("wait forever").is_unknown());
        assert_eq!(parse_command("wait 4294967295"), Command::Wait(u32::MAX));
    }

    #[test]
    fn system_commands() {
        assert_eq!(parse_command("trigger ring_bell"), Command::Trigger("ring_bell".into()));
        assert_eq!(parse_command("?"), Command::Help);
        assert_eq!(parse_command("exit"), Command::Quit);
        assert_eq!(parse_command("dance"), Command::Unknown("dance".into()));
    }
}
