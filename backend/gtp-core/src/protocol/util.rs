//! Command translation across protocol versions and the state-changing
//! command guard.

use common::{Color, Placement};

/// Commands that mutate engine board state. Issuing any of these directly
/// while a synchronizer owns the mirror would desynchronize it silently.
const STATE_CHANGING_COMMANDS: &[&str] = &[
    "black",
    "boardsize",
    "clear_board",
    "genmove",
    "genmove_black",
    "genmove_white",
    "gg-undo",
    "gogui-play_sequence",
    "gogui-setup",
    "loadsgf",
    "place_free_handicap",
    "play",
    "quit",
    "set_free_handicap",
    "undo",
    "white",
];

pub fn is_state_changing(name: &str) -> bool {
    STATE_CHANGING_COMMANDS.contains(&name)
}

/// The generate-move command for `color` in the given protocol version.
pub(crate) fn command_genmove(protocol_version: u32, color: Color) -> String {
    if protocol_version == 1 {
        format!("genmove_{}", color.word())
    } else {
        format!("genmove {}", color.letter())
    }
}

/// The play command for a move placement in the given protocol version.
/// Version 1 uses the color word as the command name itself.
pub(crate) fn command_play(protocol_version: u32, placement: &Placement) -> String {
    let vertex = match placement.point {
        Some(point) => point.to_string(),
        None => String::from("pass"),
    };

    if protocol_version == 1 {
        format!("{} {vertex}", placement.color.word())
    } else {
        format!("play {} {vertex}", placement.color.letter())
    }
}

/// The commands that produce an empty board of the given size. In version 1
/// `boardsize` already clears; version 2 needs an explicit `clear_board`.
pub(crate) fn commands_clear_board(protocol_version: u32, size: u32) -> Vec<String> {
    if protocol_version == 1 {
        vec![format!("boardsize {size}")]
    } else {
        vec![format!("boardsize {size}"), String::from("clear_board")]
    }
}

/// The setup command for a single setup edit (requires `gogui-setup`).
pub(crate) fn command_setup(placement: &Placement) -> String {
    let vertex = match placement.point {
        Some(point) => point.to_string(),
        None => String::from("pass"),
    };
    format!("gogui-setup {} {vertex}", placement.color.letter())
}

/// The bulk replay command for a run of played moves (requires
/// `gogui-play_sequence`).
pub(crate) fn command_play_sequence(placements: &[Placement]) -> String {
    let mut command = String::from("gogui-play_sequence");

    for placement in placements {
        command.push(' ');
        command.push_str(placement.color.letter());
        command.push(' ');
        match placement.point {
            Some(point) => command.push_str(&point.to_string()),
            None => command.push_str("pass"),
        }
    }

    command
}

/// The undo command for `count` steps: `gg-undo` with an explicit count
/// when the caller chose the bulk form, plain single-step `undo` otherwise.
pub(crate) fn command_undo(count: usize, bulk: bool) -> String {
    if bulk {
        format!("gg-undo {count}")
    } else {
        String::from("undo")
    }
}
