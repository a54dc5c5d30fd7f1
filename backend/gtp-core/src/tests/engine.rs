// Unit tests for engine-side framing.

use crate::engine::{EngineCommand, format_response};
use crate::protocol::GtpResponse;
use crate::transport::StreamEvent;
use crate::transport::reader::read_responses;

use tokio::sync::mpsc::unbounded_channel;

/// **VALUE**: Verifies inbound command parsing: ids, arguments, comments.
///
/// **BUG THIS CATCHES**: Would catch a numeric first token being treated as
/// a command name, or comment lines producing phantom commands.
#[test]
fn given_input_lines_when_parsed_then_classified_correctly() {
    // GIVEN: A plain command
    let plain = EngineCommand::parse("play b D4").expect("parses");
    assert_eq!(plain.id(), None);
    assert_eq!(plain.name(), "play");
    assert_eq!(plain.arguments(), ["b", "D4"]);

    // GIVEN: A numbered command
    let numbered = EngineCommand::parse("42 genmove w").expect("parses");
    assert_eq!(numbered.id(), Some(42));
    assert_eq!(numbered.name(), "genmove");
    assert_eq!(numbered.argument(0), Some("w"));

    // GIVEN: Lines that must never become commands
    assert!(EngineCommand::parse("").is_none());
    assert!(EngineCommand::parse("   ").is_none());
    assert!(EngineCommand::parse("# interrupt").is_none());
    assert!(EngineCommand::parse("play b D4 # trailing comment").is_some());
}

/// **VALUE**: Verifies trailing comments are stripped from parsed commands.
#[test]
fn given_trailing_comment_when_parsed_then_arguments_stop_at_hash() {
    let command = EngineCommand::parse("boardsize 19 # small boards later").expect("parses");
    assert_eq!(command.arguments(), ["19"]);
}

/// **VALUE**: Verifies response formatting: status, id echo, terminator.
///
/// **WHY THIS MATTERS**: A response frame ends with exactly one blank line;
/// any deviation desynchronizes every client reading us.
#[test]
fn given_results_when_formatted_then_frames_are_well_formed() {
    assert_eq!(format_response(&Ok(String::new()), None), "=\n\n");
    assert_eq!(format_response(&Ok(String::from("2")), Some(7)), "=7 2\n\n");
    assert_eq!(
        format_response(&Err(String::from("unknown command")), Some(3)),
        "?3 unknown command\n\n"
    );
}

/// **VALUE**: Verifies interior blank lines are collapsed to a space.
///
/// **WHY THIS MATTERS**: A truly empty line inside a payload would
/// terminate the frame early and the rest of the payload would be read as
/// garbage ahead of the next response. Collapsing is the engine side's
/// obligation.
///
/// **BUG THIS CATCHES**: Would catch payload text being emitted verbatim.
#[test]
fn given_payload_with_blank_line_when_formatted_then_collapsed() {
    let formatted = format_response(&Ok(String::from("first\n\nsecond")), None);
    assert_eq!(formatted, "= first\n \nsecond\n\n");
}

/// **VALUE**: Framing idempotence: encode through the engine formatter,
/// decode through the transport frame reader, and the payload survives
/// exactly.
///
/// **WHY THIS MATTERS**: gtp-core sits on both sides of the wire (client
/// and engine framing); if the two disagree on any payload shape, every
/// tool built from both halves corrupts data silently.
///
/// **BUG THIS CATCHES**: Would catch terminator handling, prefix
/// stripping, and whitespace-only line handling drifting apart.
#[tokio::test]
async fn given_formatted_responses_when_read_back_then_payload_round_trips() {
    for payload in ["", "2", "multi\nline\nanswer", "  indented", "space only\n \nline"] {
        // GIVEN: A wire frame produced by the engine side
        let text = format_response(&Ok(String::from(payload)), Some(9));

        // WHEN: Reading it back through the transport frame reader
        let (events_tx, mut events_rx) = unbounded_channel();
        read_responses(text.as_bytes(), events_tx).await;

        let Some(StreamEvent::Frame(lines)) = events_rx.recv().await else {
            panic!("Expected a frame for payload {payload:?}");
        };

        // THEN: The parsed payload matches the original
        let response = GtpResponse::parse(&lines).expect("parses");
        assert!(response.is_success());
        assert_eq!(response.id(), Some(9));
        assert_eq!(response.payload(), payload.trim_end());
    }
}

/// **VALUE**: Verifies stdout noise ahead of a response becomes invalid-line
/// events instead of aborting the read.
///
/// **WHY THIS MATTERS**: Real engines print banners and debug text to
/// stdout; treating that as fatal would make half the engines in the wild
/// unusable.
#[tokio::test]
async fn given_noise_before_response_when_read_then_delivered_as_invalid_lines() {
    let input = "GNU Go version banner\nloading...\n= ok\n\n";

    let (events_tx, mut events_rx) = unbounded_channel();
    read_responses(input.as_bytes(), events_tx).await;

    let Some(StreamEvent::InvalidLine(first)) = events_rx.recv().await else {
        panic!("Expected first invalid line");
    };
    assert_eq!(first, "GNU Go version banner");

    let Some(StreamEvent::InvalidLine(second)) = events_rx.recv().await else {
        panic!("Expected second invalid line");
    };
    assert_eq!(second, "loading...");

    let Some(StreamEvent::Frame(lines)) = events_rx.recv().await else {
        panic!("Expected the frame after the noise");
    };
    assert_eq!(lines, vec!["= ok"]);

    assert!(matches!(events_rx.recv().await, Some(StreamEvent::Eof)));
}
