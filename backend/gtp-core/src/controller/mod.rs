//! Engine lifecycle orchestration.
//!
//! The controller owns exactly one engine session and one synchronizer at
//! a time and sequences the high-level operations the front end needs:
//! attach, generate move, relay a human move, interrupt, detach. All
//! session and mirror mutation happens through `&mut self`, so there is
//! never a second writer; interruption, the one operation that must land
//! while a command is outstanding, goes through a cloneable
//! [`InterruptHandle`] obtained up front.

pub mod session;

pub use session::EngineSession;

use crate::error::CoreError;
use crate::error::controller::ControllerError;
use crate::error::gtp::GtpError;
use crate::protocol::{
    GtpClient, InterruptMode, IoObserver, TimeoutCallback, signal_interrupt, util,
};
use crate::sync::{BoardView, GtpSynchronizer, ProgressCallback};
use crate::transport::{Transport, TransportHandle};
use crate::INTERRUPT_COMMENT_LINE;

use common::point::parse_vertex;
use common::{Color, ErrorLocation, Placement, Point};

use std::panic::Location;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};

/// How long a polite `quit` may take before detach stops waiting for it.
const QUIT_TIMEOUT: Duration = Duration::from_secs(3);

/// How long detach waits for process exit before killing.
const EXIT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the process to die after a kill.
const KILL_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of the controller. `Dead` is absorbing: it is entered from
/// any attached state on process death and only left by detaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Detached,
    Attaching,
    Idle,
    Running,
    Detaching,
    Dead,
}

/// Result of a generate-move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenmoveAnswer {
    Play(Point),
    Pass,
    Resign,
}

pub struct EngineController {
    state: ControllerState,
    client: Option<GtpClient>,
    synchronizer: GtpSynchronizer,
    session: Option<EngineSession>,
    running: Arc<AtomicBool>,
    observer: Option<Arc<dyn IoObserver>>,
}

impl EngineController {
    /// `fill_passes` is forwarded to the synchronizer; see
    /// [`GtpSynchronizer::new`].
    pub fn new(fill_passes: bool) -> Self {
        Self {
            state: ControllerState::Detached,
            client: None,
            synchronizer: GtpSynchronizer::new(fill_passes),
            session: None,
            running: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The attached engine's capabilities, while one is attached and alive.
    pub fn session(&self) -> Option<&EngineSession> {
        self.session.as_ref()
    }

    pub fn is_out_of_sync(&self) -> bool {
        self.synchronizer.is_out_of_sync()
    }

    /// Observer applied to the client of the next attach.
    pub fn set_observer(&mut self, observer: Arc<dyn IoObserver>) {
        self.observer = Some(observer);
    }

    pub fn set_progress_callback(&mut self, progress: ProgressCallback) {
        self.synchronizer.set_progress_callback(progress);
    }

    /// Attach an engine: spawn it, run the capability handshake, and bring
    /// its board to `board`.
    ///
    /// Each capability query tolerates individual failure (the engine
    /// simply lacks that feature); only process start and a malformed
    /// `protocol_version` answer abort the attach, in which case the
    /// process is killed and the controller returns to `Detached`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidState`] when already attached;
    /// [`crate::error::SpawnError`] when the process cannot be started;
    /// [`GtpError`] when the handshake or initial replay fails.
    pub async fn attach(
        &mut self,
        command_line: &str,
        working_dir: Option<&Path>,
        board: &dyn BoardView,
    ) -> Result<EngineSession, CoreError> {
        if !matches!(self.state, ControllerState::Detached) {
            return Err(ControllerError::InvalidState {
                message: String::from("A program is already attached"),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        }

        self.state = ControllerState::Attaching;

        let transport = match Transport::start(command_line, working_dir) {
            Ok(transport) => transport,
            Err(error) => {
                self.state = ControllerState::Detached;
                return Err(error.into());
            }
        };

        let pid = transport.pid();
        let mut client = GtpClient::new(transport, true);
        if let Some(observer) = &self.observer {
            client.set_observer(Arc::clone(observer));
        }

        match self.initialize_session(&mut client, board, pid).await {
            Ok(session) => {
                info!(
                    "Attached {} (protocol version {})",
                    session.name.as_deref().unwrap_or("engine"),
                    session.protocol_version
                );
                self.client = Some(client);
                self.session = Some(session.clone());
                self.state = ControllerState::Idle;
                Ok(session)
            }
            Err(error) => {
                warn!("Attach failed: {error}");
                client.kill().await;
                self.synchronizer.reset();
                self.state = ControllerState::Detached;
                Err(error)
            }
        }
    }

    async fn initialize_session(
        &mut self,
        client: &mut GtpClient,
        board: &dyn BoardView,
        pid: Option<u32>,
    ) -> Result<EngineSession, CoreError> {
        let name = optional_query(client, "name").await?;
        let protocol_version = client.query_protocol_version().await?;
        let version = optional_query(client, "version").await?;

        if let Err(error) = client.query_supported_commands().await {
            match error {
                GtpError::Failure { message, .. } => {
                    debug!("Command list query failed: {message}");
                }
                other => return Err(other.into()),
            }
        }

        let interrupt_mode = client.query_interrupt_support().await?;
        let supported_commands = client.supported_commands().cloned().unwrap_or_default();

        self.synchronizer.init(client, board).await?;

        Ok(EngineSession {
            name,
            version,
            protocol_version,
            supported_commands,
            interrupt_mode,
            pid,
        })
    }

    /// Bring the engine's board to `board`, retrying once via full
    /// initialization when the mirror is out of sync.
    ///
    /// # Errors
    ///
    /// Propagates command failures; process death transitions to `Dead`.
    pub async fn synchronize(&mut self, board: &dyn BoardView) -> Result<(), CoreError> {
        self.ensure_idle()?;

        let result = {
            let (client, synchronizer) = self.parts_mut()?;
            match synchronizer.synchronize(client, board).await {
                Err(GtpError::OutOfSync { .. }) => {
                    info!("Mirror out of sync, retrying with full initialization");
                    synchronizer.init(client, board).await
                }
                other => other,
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(self.absorb(error)),
        }
    }

    /// Relay a move the human is about to play. The engine sees it before
    /// it is committed to the visible game tree and may reject it.
    ///
    /// # Errors
    ///
    /// [`GtpError::Failure`] when the engine rejects the move (the mirror
    /// is left untouched); process death transitions to `Dead`.
    pub async fn play(&mut self, mv: Placement) -> Result<(), CoreError> {
        self.ensure_idle()?;

        let result = {
            let (client, synchronizer) = self.parts_mut()?;
            synchronizer.update_human_move(client, mv).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(self.absorb(error)),
        }
    }

    /// Synchronize to `board`, then ask the engine to generate and play a
    /// move for `color`.
    ///
    /// Lengthy: the call suspends until the engine answers. Obtain an
    /// [`InterruptHandle`] beforehand to ask the engine to finish early;
    /// the answer is still awaited here either way. Exactly one lengthy
    /// command may be outstanding, which `&mut self` already guarantees.
    pub async fn genmove(
        &mut self,
        color: Color,
        board: &dyn BoardView,
        timeout: Option<Duration>,
        callback: Option<TimeoutCallback>,
    ) -> Result<GenmoveAnswer, CoreError> {
        self.ensure_idle()?;
        self.synchronize(board).await?;

        let Some(client) = self.client.as_mut() else {
            return Err(not_attached().into());
        };

        let command = client.command_genmove(color);
        self.state = ControllerState::Running;
        self.running.store(true, Ordering::SeqCst);
        let result = client.send_with_timeout(&command, timeout, callback).await;
        self.running.store(false, Ordering::SeqCst);

        match result {
            Ok(text) => {
                self.state = ControllerState::Idle;

                let answer = match parse_genmove_answer(&text) {
                    Ok(answer) => answer,
                    Err(error) => {
                        // the engine advanced but we cannot tell where
                        self.synchronizer.mark_out_of_sync();
                        return Err(error.into());
                    }
                };

                match answer {
                    GenmoveAnswer::Play(point) => {
                        self.synchronizer.update_after_genmove(color, Some(point));
                    }
                    GenmoveAnswer::Pass => {
                        self.synchronizer.update_after_genmove(color, None);
                    }
                    GenmoveAnswer::Resign => {}
                }

                Ok(answer)
            }
            Err(error) => Err(self.absorb(error)),
        }
    }

    /// Forward an arbitrary (analyze-style) command to the engine.
    ///
    /// # Errors
    ///
    /// [`ControllerError::StateChanging`] for commands that would mutate
    /// the engine's board behind the synchronizer's back.
    pub async fn send_command(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
        callback: Option<TimeoutCallback>,
    ) -> Result<String, CoreError> {
        self.ensure_idle()?;

        let name = command.trim().split_whitespace().next().unwrap_or_default();
        if util::is_state_changing(name) {
            return Err(ControllerError::StateChanging {
                message: format!("Command {name} would desynchronize the board"),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        }

        let Some(client) = self.client.as_mut() else {
            return Err(not_attached().into());
        };

        self.state = ControllerState::Running;
        self.running.store(true, Ordering::SeqCst);
        let result = client.send_with_timeout(command, timeout, callback).await;
        self.running.store(false, Ordering::SeqCst);

        match result {
            Ok(text) => {
                self.state = ControllerState::Idle;
                Ok(text)
            }
            Err(error) => Err(self.absorb(error)),
        }
    }

    /// Handle for interrupting or killing the engine while a lengthy
    /// command runs. Obtain it before issuing the command; the controller
    /// itself is exclusively borrowed while the command is awaited.
    pub fn interrupt_handle(&self) -> Result<InterruptHandle, ControllerError> {
        let Some(client) = self.client.as_ref() else {
            return Err(not_attached());
        };

        Ok(InterruptHandle {
            transport: client.transport_handle(),
            mode: client.interrupt_mode(),
            running: Arc::clone(&self.running),
        })
    }

    /// Forcibly terminate the engine and enter the absorbing `Dead` state.
    pub async fn kill(&mut self) {
        if let Some(client) = self.client.as_mut() {
            client.kill().await;
        }

        self.session = None;
        self.synchronizer.reset();
        self.state = ControllerState::Dead;
    }

    /// Detach from the engine: polite `quit` (failure irrelevant on the
    /// way out), close its input, wait a bounded time for exit, kill as a
    /// last resort.
    pub async fn detach(&mut self) {
        if matches!(self.state, ControllerState::Detached) {
            return;
        }

        self.state = ControllerState::Detaching;

        if let Some(client) = self.client.as_mut() {
            if client.is_alive() {
                if let Err(error) = client.send_with_timeout("quit", Some(QUIT_TIMEOUT), None).await
                {
                    debug!("Quit on detach failed: {error}");
                }
            }

            client.close_input().await;

            if !client.wait_exit(EXIT_WAIT_TIMEOUT).await {
                warn!("Go program did not exit on detach, killing");
                client.kill().await;
                let _ = client.wait_exit(KILL_WAIT_TIMEOUT).await;
            }
        }

        self.client = None;
        self.session = None;
        self.synchronizer.reset();
        self.state = ControllerState::Detached;
        info!("Detached from Go program");
    }

    /// Route an operation failure into the lifecycle: process death is
    /// absorbing and invalidates session and sync state atomically; other
    /// failures return the controller to `Idle`.
    fn absorb(&mut self, error: GtpError) -> CoreError {
        if matches!(error, GtpError::Terminated { .. }) {
            self.state = ControllerState::Dead;
            self.session = None;
            self.synchronizer.reset();
        } else {
            self.state = ControllerState::Idle;
        }

        error.into()
    }

    #[track_caller]
    fn ensure_idle(&self) -> Result<(), ControllerError> {
        let message = match self.state {
            ControllerState::Idle => return Ok(()),
            ControllerState::Running => "A command is already running",
            ControllerState::Dead => "The program has terminated",
            ControllerState::Detached | ControllerState::Attaching | ControllerState::Detaching => {
                "No program attached"
            }
        };

        Err(ControllerError::InvalidState {
            message: String::from(message),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn parts_mut(&mut self) -> Result<(&mut GtpClient, &mut GtpSynchronizer), ControllerError> {
        match self.client.as_mut() {
            Some(client) => Ok((client, &mut self.synchronizer)),
            None => Err(not_attached()),
        }
    }
}

/// Cloneable interrupt/kill surface usable while the controller is busy.
#[derive(Clone)]
pub struct InterruptHandle {
    transport: TransportHandle,
    mode: InterruptMode,
    running: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Whether a lengthy command is currently outstanding.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the engine to finish the outstanding command early. Does not
    /// cancel the command; its response is still awaited by the original
    /// caller.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidState`] when no command is running;
    /// [`GtpError::Unsupported`] when the engine offers no interrupt mode,
    /// in which case [`kill`](Self::kill) is the only remaining option.
    pub async fn interrupt(&self) -> Result<(), CoreError> {
        if !self.is_running() {
            return Err(ControllerError::InvalidState {
                message: String::from("No command is running"),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        }

        match self.mode {
            InterruptMode::CommentLine => {
                self.transport.write_line(INTERRUPT_COMMENT_LINE).await?;
                Ok(())
            }
            InterruptMode::Signal { pid } => {
                signal_interrupt(pid).await?;
                Ok(())
            }
            InterruptMode::None => Err(GtpError::Unsupported {
                message: String::from(
                    "Engine does not support interruption; killing the program is the only option",
                ),
                location: ErrorLocation::from(Location::caller()),
            }
            .into()),
        }
    }

    /// Forcibly terminate the engine process. The outstanding command, if
    /// any, fails with a terminal dead-session error.
    pub async fn kill(&self) {
        self.transport.kill().await;
    }
}

#[track_caller]
fn not_attached() -> ControllerError {
    ControllerError::InvalidState {
        message: String::from("No program attached"),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Best-effort capability query: a `?` answer means the engine simply
/// lacks the command.
async fn optional_query(client: &mut GtpClient, command: &str) -> Result<Option<String>, GtpError> {
    match client.send(command).await {
        Ok(text) => Ok(Some(text.trim().to_string())),
        Err(GtpError::Failure { .. }) => {
            debug!("Engine lacks {command}");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

fn parse_genmove_answer(text: &str) -> Result<GenmoveAnswer, GtpError> {
    let trimmed = text.trim();

    if trimmed.eq_ignore_ascii_case("resign") {
        return Ok(GenmoveAnswer::Resign);
    }

    match parse_vertex(trimmed) {
        Ok(Some(point)) => Ok(GenmoveAnswer::Play(point)),
        Ok(None) => Ok(GenmoveAnswer::Pass),
        Err(error) => Err(GtpError::Protocol {
            message: format!("Invalid genmove answer {trimmed:?}: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
