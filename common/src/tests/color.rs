// Unit tests for color parsing and protocol forms.

use crate::color::Color;

/// **VALUE**: Verifies both single-letter and full-word color forms parse.
///
/// **WHY THIS MATTERS**: GTP accepts "b"/"black"/"w"/"white" in any case;
/// command translation and engine-side parsing both rely on this.
///
/// **BUG THIS CATCHES**: Would catch case-sensitive or letter-only parsing.
#[test]
fn given_gtp_color_arguments_when_parsed_then_accepted() {
    assert_eq!(Color::parse("b").unwrap(), Color::Black);
    assert_eq!(Color::parse("BLACK").unwrap(), Color::Black);
    assert_eq!(Color::parse("w").unwrap(), Color::White);
    assert_eq!(Color::parse("White").unwrap(), Color::White);
    assert!(Color::parse("green").is_err());
    assert!(Color::parse("").is_err());
}

/// **VALUE**: Verifies the protocol forms used in command translation.
///
/// **BUG THIS CATCHES**: Would catch the version 1 command names drifting
/// from "black"/"white" or the version 2 argument from "b"/"w".
#[test]
fn given_player_colors_when_formatted_then_protocol_forms_match() {
    assert_eq!(Color::Black.letter(), "b");
    assert_eq!(Color::White.word(), "white");
    assert_eq!(Color::Black.other(), Color::White);
    assert_eq!(Color::Empty.other(), Color::Empty);
}
