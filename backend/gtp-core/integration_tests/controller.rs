//! Controller lifecycle against real spawned engine processes.

use crate::helpers::{
    TestBoard, dying_engine_script, passing_engine_script, resigning_engine_script,
    well_behaved_engine_script,
};

use gtp_core::controller::{ControllerState, EngineController, GenmoveAnswer};
use gtp_core::error::{ControllerError, CoreError};

use common::{Color, Point};

/// **VALUE**: The full attach handshake against a real child process:
/// spawn, identity queries, capability list, interrupt probe, board init.
///
/// **WHY THIS MATTERS**: This is the one test that exercises process
/// spawning, pipe wiring, background readers, and the protocol stack
/// together, the way the front end actually uses them.
///
/// **BUG THIS CATCHES**: Would catch broken pipe setup (hang), handshake
/// ordering, and capability caching regressions that in-process doubles
/// cannot see.
#[tokio::test]
async fn given_real_engine_when_attaching_then_session_capabilities_cached() {
    // GIVEN: A scripted shell engine on disk
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);

    // WHEN: Attaching
    let session = controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    // THEN: Identity and capabilities were cached and the controller is idle
    assert_eq!(session.name.as_deref(), Some("scripted"));
    assert_eq!(session.version.as_deref(), Some("1.0"));
    assert_eq!(session.protocol_version, 2);
    assert!(session.is_supported("play"));
    assert!(session.is_supported("undo"));
    assert!(!session.is_supported("gg-undo"));
    assert_eq!(controller.state(), ControllerState::Idle);

    controller.detach().await;
    assert_eq!(controller.state(), ControllerState::Detached);
}

/// **VALUE**: Generate-move end to end: synchronize, send genmove, parse
/// the vertex, record it in the mirror, stay idle.
#[tokio::test]
async fn given_attached_engine_when_generating_move_then_vertex_returned() {
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    // WHEN: Asking the engine for a black move
    let answer = controller
        .genmove(Color::Black, &board, None, None)
        .await
        .expect("genmove");

    // THEN: The scripted engine always answers C3
    let expected = Point::parse_gtp("C3").expect("vertex");
    assert_eq!(answer, GenmoveAnswer::Play(expected));
    assert_eq!(controller.state(), ControllerState::Idle);

    controller.detach().await;
}

/// **VALUE**: A resignation answer is surfaced as such and, unlike a
/// vertex or pass, changes no board state.
#[tokio::test]
async fn given_resigning_engine_when_generating_move_then_resign_returned() {
    let (_guard, command_line) = resigning_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    let answer = controller
        .genmove(Color::White, &board, None, None)
        .await
        .expect("genmove");
    assert_eq!(answer, GenmoveAnswer::Resign);
    assert_eq!(controller.state(), ControllerState::Idle);

    controller.detach().await;
}

/// **VALUE**: A pass answer (any case) is distinguished from a vertex.
#[tokio::test]
async fn given_passing_engine_when_generating_move_then_pass_returned() {
    let (_guard, command_line) = passing_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    let answer = controller
        .genmove(Color::Black, &board, None, None)
        .await
        .expect("genmove");
    assert_eq!(answer, GenmoveAnswer::Pass);

    controller.detach().await;
}

/// **VALUE**: A nonexistent engine binary fails the attach with a spawn
/// error and leaves the controller detached and reusable.
#[tokio::test]
async fn given_bad_command_line_when_attaching_then_spawn_error() {
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);

    let error = controller
        .attach("/nonexistent/engine --mode gtp", None, &board)
        .await
        .expect_err("attach must fail");

    assert!(matches!(error, CoreError::Spawn(_)));
    assert_eq!(controller.state(), ControllerState::Detached);
}

/// **VALUE**: An engine that dies during the handshake aborts the attach
/// cleanly instead of hanging or leaking a half-built session.
#[tokio::test]
async fn given_dying_engine_when_attaching_then_attach_fails_detached() {
    let (_guard, command_line) = dying_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);

    let error = controller
        .attach(&command_line, None, &board)
        .await
        .expect_err("attach must fail");

    assert!(matches!(error, CoreError::Gtp(_)));
    assert_eq!(controller.state(), ControllerState::Detached);
    assert!(controller.session().is_none());
}

/// **VALUE**: The state-changing command guard: board-mutating commands
/// are refused by the passthrough send while harmless queries go through.
///
/// **WHY THIS MATTERS**: One `play` slipped past the controller corrupts
/// the mirror invisibly; every later synchronize diffs against a lie.
#[tokio::test]
async fn given_attached_engine_when_sending_state_changing_command_then_refused() {
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    // WHEN: Trying to mutate the board directly
    for command in ["play b D4", "undo", "boardsize 9", "clear_board", "quit"] {
        let error = controller
            .send_command(command, None, None)
            .await
            .expect_err("must be refused");
        assert!(
            matches!(
                error,
                CoreError::Controller(ControllerError::StateChanging { .. })
            ),
            "Guard should refuse: {command}"
        );
    }

    // THEN: Harmless queries still pass through
    let name = controller
        .send_command("name", None, None)
        .await
        .expect("query passes");
    assert_eq!(name, "scripted");

    controller.detach().await;
}

/// **VALUE**: Process death is absorbing: the controller enters `Dead`,
/// invalidates the session, and refuses further operations until detach.
///
/// **WHY THIS MATTERS**: The front end distinguishes "command failed" from
/// "program crashed" by this state; conflating them breaks the reattach
/// offer.
#[tokio::test]
async fn given_engine_death_when_commanding_then_controller_dead_until_detach() {
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    // WHEN: The engine dies mid-command (scripted "die" exits silently)
    let error = controller
        .send_command("die", None, None)
        .await
        .expect_err("engine died");
    assert!(matches!(error, CoreError::Gtp(_)));

    // THEN: Dead is absorbing and the session is invalidated
    assert_eq!(controller.state(), ControllerState::Dead);
    assert!(controller.session().is_none());

    let refused = controller
        .send_command("name", None, None)
        .await
        .expect_err("dead controller refuses");
    assert!(matches!(
        refused,
        CoreError::Controller(ControllerError::InvalidState { .. })
    ));

    // THEN: Detach recovers to Detached for a fresh attach
    controller.detach().await;
    assert_eq!(controller.state(), ControllerState::Detached);
}

/// **VALUE**: Reattaching after detach works on the same controller.
#[tokio::test]
async fn given_detached_controller_when_reattaching_then_succeeds() {
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);

    controller
        .attach(&command_line, None, &board)
        .await
        .expect("first attach");
    controller.detach().await;

    let (_guard2, command_line2) = well_behaved_engine_script();
    controller
        .attach(&command_line2, None, &board)
        .await
        .expect("second attach");
    assert_eq!(controller.state(), ControllerState::Idle);

    controller.detach().await;
}

/// **VALUE**: Attaching twice without detaching is an invalid state, not a
/// silent engine swap.
#[tokio::test]
async fn given_attached_controller_when_attaching_again_then_invalid_state() {
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    let error = controller
        .attach(&command_line, None, &board)
        .await
        .expect_err("second attach refused");
    assert!(matches!(
        error,
        CoreError::Controller(ControllerError::InvalidState { .. })
    ));

    controller.detach().await;
}

/// **VALUE**: The interrupt handle reports unsupported interruption for an
/// engine without either interrupt capability, and refuses to interrupt
/// while nothing is running.
#[tokio::test]
async fn given_no_interrupt_capability_when_using_handle_then_errors_are_specific() {
    let (_guard, command_line) = well_behaved_engine_script();
    let board = TestBoard::empty(19);
    let mut controller = EngineController::new(false);
    controller
        .attach(&command_line, None, &board)
        .await
        .expect("attach");

    let handle = controller.interrupt_handle().expect("handle");
    assert!(!handle.is_running());

    // Nothing is running, so interrupting is a caller error
    let error = handle.interrupt().await.expect_err("nothing running");
    assert!(matches!(
        error,
        CoreError::Controller(ControllerError::InvalidState { .. })
    ));

    controller.detach().await;
}
