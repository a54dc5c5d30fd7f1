// Unit tests for outbound command construction.

use crate::protocol::GtpCommand;

/// **VALUE**: Verifies name/argument parsing and the wire form.
///
/// **BUG THIS CATCHES**: Would catch arguments collapsing into the name or
/// extra separators appearing on the wire.
#[test]
fn given_command_text_when_parsed_then_wire_form_round_trips() {
    // GIVEN: Command text with arguments and stray outer whitespace
    let command = GtpCommand::new("  play b D4 ").expect("parses");

    // THEN: Name, arguments, and the wire line are normalized
    assert_eq!(command.name(), "play");
    assert_eq!(command.arguments(), ["b", "D4"]);
    assert_eq!(command.to_line(), "play b D4");
}

/// **VALUE**: Verifies the sequence id lands in front of the command.
///
/// **WHY THIS MATTERS**: Response correlation relies on the id being the
/// first token of the request line.
#[test]
fn given_id_when_attached_then_leads_the_wire_line() {
    let command = GtpCommand::new("list_commands").expect("parses").with_id(7);
    assert_eq!(command.id(), Some(7));
    assert_eq!(command.to_line(), "7 list_commands");
}

/// **VALUE**: Verifies framing-hostile text is rejected at construction.
///
/// **WHY THIS MATTERS**: An embedded newline would smuggle a second line
/// into the stream and desynchronize response framing; a comment line is
/// never answered, so waiting on one would hang the caller forever.
///
/// **BUG THIS CATCHES**: Would catch validation being skipped for any of
/// the three hostile shapes.
#[test]
fn given_hostile_command_text_when_parsed_then_rejected() {
    assert!(GtpCommand::new("").is_err());
    assert!(GtpCommand::new("   ").is_err());
    assert!(GtpCommand::new("play b D4\nundo").is_err());
    assert!(GtpCommand::new("# interrupt").is_err());
}
