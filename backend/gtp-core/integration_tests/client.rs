//! Protocol client behavior against engine doubles: numbering, sticky
//! death, interrupts, timeouts, and capability probing.

use crate::helpers::{RawReply, ScriptedEngine, connect, connect_raw, drain, without_id};

use gtp_core::error::GtpError;
use gtp_core::protocol::{InterruptMode, IoObserver};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn ok_frame(payload: &str) -> RawReply {
    if payload.is_empty() {
        RawReply::Respond(String::from("=\n\n"))
    } else {
        RawReply::Respond(format!("= {payload}\n\n"))
    }
}

/// **VALUE**: Command numbering monotonicity: N consecutive sends carry
/// strictly increasing embedded ids starting from 1.
///
/// **WHY THIS MATTERS**: Response correlation and shell logs rely on the
/// id sequence; a reset or skip makes mismatch warnings fire on every
/// command.
///
/// **BUG THIS CATCHES**: Would catch the counter starting at 0, not
/// incrementing, or incrementing on failed validation.
#[tokio::test]
async fn given_auto_numbering_when_sending_then_ids_increase_from_one() {
    // GIVEN: An engine answering everything
    let (mut client, log) = connect_raw(|_| ok_frame("ok")).await;

    // WHEN: Sending three commands
    for _ in 0..3 {
        client.send("name").await.expect("send");
    }

    // THEN: The wire saw ids 1, 2, 3
    assert_eq!(drain(&log), vec!["1 name", "2 name", "3 name"]);
}

/// **VALUE**: Sticky death: after end-of-stream during a send, every later
/// send fails immediately with the same terminal error and writes nothing.
///
/// **WHY THIS MATTERS**: Retrying I/O against a dead process hangs or
/// panics callers; the session must short-circuit permanently so the front
/// end can offer reattach exactly once.
///
/// **BUG THIS CATCHES**: Would catch the dead flag being cleared, or later
/// sends still reaching the transport.
#[tokio::test]
async fn given_engine_death_mid_send_when_sending_again_then_short_circuits() {
    // GIVEN: An engine that dies on the second command
    let (mut client, log) = connect_raw(|line| {
        if line.starts_with('1') {
            ok_frame("ok")
        } else {
            RawReply::Close
        }
    })
    .await;

    client.send("name").await.expect("first send succeeds");

    // WHEN: The engine dies while a command is outstanding
    let error = client.send("version").await.expect_err("second send dies");
    assert!(matches!(error, GtpError::Terminated { .. }));
    assert!(error.to_string().contains("terminated unexpectedly"));
    assert!(!client.is_alive());

    drain(&log);

    // THEN: Subsequent sends fail identically without touching the wire
    let again = client.send("name").await.expect_err("still dead");
    assert!(matches!(again, GtpError::Terminated { .. }));
    assert!(drain(&log).is_empty(), "Nothing written after death");
}

/// **VALUE**: The comment-line interrupt: exactly `# interrupt`, never
/// numbered, no response awaited.
///
/// **WHY THIS MATTERS**: A numbered interrupt would be parsed as a command
/// and answered, desynchronizing the frame stream; waiting for an answer
/// would deadlock since comments are never answered.
///
/// **BUG THIS CATCHES**: Would catch the interrupt going through the
/// normal numbered send path.
#[tokio::test]
async fn given_comment_interrupt_support_when_interrupting_then_bare_comment_line_sent() {
    // GIVEN: An engine advertising gogui-interrupt
    let (mut client, log) = connect_raw(|line| {
        if line.starts_with('#') {
            RawReply::Silent
        } else if line.contains("list_commands") {
            ok_frame("gogui-interrupt")
        } else {
            ok_frame("")
        }
    })
    .await;

    client.query_supported_commands().await.expect("handshake");
    let mode = client.query_interrupt_support().await.expect("probe");
    assert_eq!(mode, InterruptMode::CommentLine);
    drain(&log);

    // WHEN: Interrupting
    client.send_interrupt().await.expect("interrupt");

    // THEN: The wire saw the bare comment line, and the session still works
    assert_eq!(drain(&log), vec!["# interrupt"]);
    client.send("name").await.expect("session unaffected");
}

/// **VALUE**: The signal interrupt probe caches the engine's pid without
/// enabling the comment path.
#[tokio::test]
async fn given_sigint_support_when_probing_then_pid_cached() {
    let (mut client, _log) = connect_raw(|line| {
        if line.contains("list_commands") {
            ok_frame("gogui-sigint")
        } else if line.contains("gogui-sigint") {
            ok_frame("12345")
        } else {
            ok_frame("")
        }
    })
    .await;

    client.query_supported_commands().await.expect("handshake");
    let mode = client.query_interrupt_support().await.expect("probe");
    assert_eq!(mode, InterruptMode::Signal { pid: 12345 });
}

/// **VALUE**: Without either interrupt capability, interrupting fails with
/// `Unsupported` so the front end knows killing is the only option.
#[tokio::test]
async fn given_no_interrupt_support_when_interrupting_then_unsupported() {
    let (mut client, _log) = connect_raw(|line| {
        if line.contains("list_commands") {
            ok_frame("play")
        } else {
            ok_frame("")
        }
    })
    .await;

    client.query_supported_commands().await.expect("handshake");
    let mode = client.query_interrupt_support().await.expect("probe");
    assert_eq!(mode, InterruptMode::None);

    let error = client.send_interrupt().await.expect_err("unsupported");
    assert!(matches!(error, GtpError::Unsupported { .. }));
}

/// **VALUE**: The timeout continuation callback: each lapse asks the
/// callback, waiting continues while it says so, and a refusal kills the
/// process and fails terminally with the intentional-kill wording.
///
/// **WHY THIS MATTERS**: The front end shows "still thinking, cancel?"
/// prompts from this callback; busy-polling or instant failure would make
/// long genmoves unusable.
///
/// **BUG THIS CATCHES**: Would catch the callback not being re-invoked per
/// lapse, or a lapse failing the call without killing the process.
#[tokio::test]
async fn given_silent_engine_when_timeout_lapses_then_callback_decides() {
    // GIVEN: An engine that never answers "think"
    let (mut client, _log) = connect_raw(|line| {
        if line.contains("think") {
            RawReply::Silent
        } else {
            ok_frame("")
        }
    })
    .await;

    // WHEN: Waiting with a callback that continues twice then gives up
    let asked = Arc::new(AtomicUsize::new(0));
    let asked_clone = Arc::clone(&asked);
    let callback = Arc::new(move || asked_clone.fetch_add(1, Ordering::SeqCst) < 2);

    let error = client
        .send_with_timeout("think", Some(Duration::from_millis(20)), Some(callback))
        .await
        .expect_err("gives up on the third lapse");

    // THEN: Three decisions were made and the session died intentionally
    assert_eq!(asked.load(Ordering::SeqCst), 3);
    assert!(matches!(error, GtpError::Terminated { .. }));
    assert!(!error.to_string().contains("unexpectedly"));
    assert!(!client.is_alive());
}

/// **VALUE**: A lapsed timeout with no callback gives up immediately.
#[tokio::test]
async fn given_silent_engine_when_no_callback_then_first_lapse_kills() {
    let (mut client, _log) = connect_raw(|_| RawReply::Silent).await;

    let error = client
        .send_with_timeout("think", Some(Duration::from_millis(20)), None)
        .await
        .expect_err("first lapse kills");
    assert!(matches!(error, GtpError::Terminated { .. }));
}

/// **VALUE**: A malformed `protocol_version` answer is a protocol error,
/// while a missing command silently defaults to version 2.
#[tokio::test]
async fn given_protocol_version_answers_when_probing_then_validated() {
    // GIVEN: An engine claiming version 3
    let (mut client, _log) = connect_raw(|_| ok_frame("3")).await;
    let error = client
        .query_protocol_version()
        .await
        .expect_err("version 3 is illegal");
    assert!(matches!(error, GtpError::Protocol { .. }));

    // GIVEN: An engine without the command at all
    let (mut client, _log) = connect_raw(|_| RawReply::Respond(String::from("? unknown\n\n"))).await;
    let version = client.query_protocol_version().await.expect("defaults");
    assert_eq!(version, 2);
}

/// **VALUE**: A `?` answer surfaces as `Failure` carrying the offending
/// command and the engine's message.
#[tokio::test]
async fn given_failing_engine_when_sending_then_failure_carries_command() {
    let (mut client, _log) =
        connect_raw(|_| RawReply::Respond(String::from("? unknown command\n\n"))).await;

    let error = client.send("bogus arg").await.expect_err("engine refuses");
    let GtpError::Failure { command, message, .. } = error else {
        panic!("Expected Failure, got {error:?}");
    };
    assert_eq!(command, "bogus arg");
    assert_eq!(message, "unknown command");
}

/// Observer double recording everything it is shown.
#[derive(Default)]
struct RecordingObserver {
    invalid: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
}

impl IoObserver for RecordingObserver {
    fn sent(&self, line: &str) {
        self.sent.lock().expect("lock").push(line.to_string());
    }

    fn invalid_line(&self, line: &str) {
        self.invalid.lock().expect("lock").push(line.to_string());
    }
}

/// **VALUE**: Stdout noise ahead of a response reaches the observer as
/// invalid lines while the response itself still parses.
///
/// **WHY THIS MATTERS**: This is the robustness contract for engines that
/// print banners to stdout; the noise must be displayable, not fatal.
#[tokio::test]
async fn given_noisy_engine_when_sending_then_observer_sees_invalid_lines() {
    let (mut client, _log) = connect_raw(|_| {
        RawReply::Respond(String::from("loading joseki library\n= ok\n\n"))
    })
    .await;

    let observer = Arc::new(RecordingObserver::default());
    client.set_observer(Arc::clone(&observer) as Arc<dyn IoObserver>);

    let payload = client.send("name").await.expect("send");
    assert_eq!(payload, "ok");

    assert_eq!(
        *observer.invalid.lock().expect("lock"),
        vec!["loading joseki library"]
    );
    assert_eq!(*observer.sent.lock().expect("lock"), vec!["1 name"]);
}

/// **VALUE**: Both halves of the crate's framing interoperate: a client
/// talking to an engine built on the crate's own engine-side framing gets
/// its ids echoed and payloads delivered intact.
#[tokio::test]
async fn given_engine_side_framing_when_sending_then_round_trip_works() {
    let engine = ScriptedEngine::new(&["play", "undo"]);
    let log = engine.log();
    let mut client = connect(engine).await;

    let commands = client.send("list_commands").await.expect("send");
    assert_eq!(commands, "play\nundo");
    assert_eq!(drain(&log), vec!["list_commands"]);
}

/// **VALUE**: Recorded request lines keep their ids on the wire but the
/// helper strips them for comparison, documenting the wire format itself.
#[tokio::test]
async fn given_numbered_traffic_when_stripping_ids_then_commands_compare() {
    let (mut client, log) = connect_raw(|_| ok_frame("")).await;

    client.send("boardsize 19").await.expect("send");
    client.send("clear_board").await.expect("send");

    let commands: Vec<String> = drain(&log).iter().map(|line| without_id(line)).collect();
    assert_eq!(commands, vec!["boardsize 19", "clear_board"]);
}
