// Unit tests for version-aware command translation and the state-changing
// guard.

use crate::protocol::util::{
    command_genmove, command_play, command_play_sequence, command_setup, command_undo,
    commands_clear_board,
};
use crate::protocol::is_state_changing;
use crate::tests::support::play;

use common::{Color, Placement};

/// **VALUE**: Verifies generate-move translation across protocol versions.
///
/// **WHY THIS MATTERS**: Version 1 engines only understand
/// `genmove_black`/`genmove_white`; sending the version 2 spelling makes
/// every move generation fail against older engines.
///
/// **BUG THIS CATCHES**: Would catch the translation collapsing to a single
/// spelling.
#[test]
fn given_both_protocol_versions_when_translating_genmove_then_spellings_differ() {
    assert_eq!(command_genmove(2, Color::Black), "genmove b");
    assert_eq!(command_genmove(2, Color::White), "genmove w");
    assert_eq!(command_genmove(1, Color::Black), "genmove_black");
    assert_eq!(command_genmove(1, Color::White), "genmove_white");
}

/// **VALUE**: Verifies play translation, including version 1 using the
/// color word as the command name and passes in both versions.
#[test]
fn given_both_protocol_versions_when_translating_play_then_spellings_differ() {
    let mv = play(Color::Black, "D4");
    assert_eq!(command_play(2, &mv), "play b D4");
    assert_eq!(command_play(1, &mv), "black D4");

    let pass = Placement::pass(Color::White);
    assert_eq!(command_play(2, &pass), "play w pass");
    assert_eq!(command_play(1, &pass), "white pass");
}

/// **VALUE**: Verifies the board-clearing sequence per protocol version.
///
/// **WHY THIS MATTERS**: In version 1 `boardsize` already clears and
/// `clear_board` does not exist; sending it would fail the whole
/// initialization. In version 2 omitting `clear_board` leaves stale stones.
#[test]
fn given_both_protocol_versions_when_clearing_then_command_sequences_differ() {
    assert_eq!(
        commands_clear_board(2, 19),
        vec!["boardsize 19", "clear_board"]
    );
    assert_eq!(commands_clear_board(1, 9), vec!["boardsize 9"]);
}

/// **VALUE**: Verifies bulk replay and setup command formats.
#[test]
fn given_placements_when_formatting_bulk_commands_then_pairs_are_flat() {
    let sequence = [
        play(Color::Black, "D4"),
        play(Color::White, "Q16"),
        Placement::pass(Color::Black),
    ];
    assert_eq!(
        command_play_sequence(&sequence),
        "gogui-play_sequence b D4 w Q16 b pass"
    );

    let edit = crate::tests::support::setup(Color::Black, "C3");
    assert_eq!(command_setup(&edit), "gogui-setup b C3");
}

/// **VALUE**: Verifies undo command selection.
#[test]
fn given_undo_counts_when_formatting_then_bulk_carries_count() {
    assert_eq!(command_undo(1, false), "undo");
    assert_eq!(command_undo(3, true), "gg-undo 3");
    assert_eq!(command_undo(1, true), "gg-undo 1");
}

/// **VALUE**: Verifies the state-changing guard covers every command that
/// mutates engine board state, in both protocol spellings.
///
/// **WHY THIS MATTERS**: Any of these passing through the controller's
/// generic send would move the engine's board behind the synchronizer's
/// back, and every later diff would be computed against a lie.
///
/// **BUG THIS CATCHES**: Would catch a command disappearing from the guard
/// list, e.g. during a rename.
#[test]
fn given_board_mutating_commands_when_checked_then_flagged() {
    for name in [
        "boardsize",
        "clear_board",
        "play",
        "undo",
        "genmove",
        "genmove_black",
        "genmove_white",
        "black",
        "white",
        "loadsgf",
        "place_free_handicap",
        "set_free_handicap",
        "quit",
        "gg-undo",
        "gogui-play_sequence",
        "gogui-setup",
    ] {
        assert!(is_state_changing(name), "Should be guarded: {name}");
    }

    for name in ["name", "version", "showboard", "list_commands", "gogui-analyze_commands"] {
        assert!(!is_state_changing(name), "Should pass through: {name}");
    }
}
