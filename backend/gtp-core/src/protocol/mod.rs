//! GTP protocol client: command/response framing over a transport.
//!
//! Turns transport frames into protocol semantics and owns command
//! numbering and the capability caches. Exactly one command may be in
//! flight per client; `&mut self` on [`GtpClient::send`] makes concurrent
//! sends unrepresentable. Any I/O failure is sticky: the session is dead
//! permanently and every later call short-circuits to the same error
//! without touching the process.

pub mod command;
pub mod response;
pub mod util;

pub use command::GtpCommand;
pub use response::GtpResponse;
pub use util::is_state_changing;

use crate::error::gtp::GtpError;
use crate::transport::{StreamEvent, Transport, TransportHandle};
use crate::{DEFAULT_PROTOCOL_VERSION, INTERRUPT_COMMENT_LINE};

use common::{Color, ErrorLocation, Placement};

use std::collections::HashSet;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

/// Observer for protocol traffic, the seam a GTP shell window or log sink
/// hangs off.
pub trait IoObserver: Send + Sync {
    fn sent(&self, _line: &str) {}
    fn received(&self, _text: &str) {}
    fn invalid_line(&self, _line: &str) {}
    fn stderr(&self, _text: &str) {}
}

/// Decision callback invoked each time a send exceeds its timeout.
/// Return `true` to keep waiting, `false` to kill the engine process.
pub type TimeoutCallback = Arc<dyn Fn() -> bool + Send + Sync>;

/// How an interrupt can be delivered to the attached engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    /// No interrupt support; killing the process is the only option.
    None,
    /// The engine watches its input for the `# interrupt` comment line.
    CommentLine,
    /// The engine handles SIGINT; the pid was learned from the probe.
    Signal { pid: u32 },
}

pub struct GtpClient {
    transport: Transport,
    auto_number: bool,
    next_id: u32,
    protocol_version: u32,
    supported_commands: Option<HashSet<String>>,
    interrupt_mode: InterruptMode,
    dead: Option<GtpError>,
    observer: Option<Arc<dyn IoObserver>>,
}

impl GtpClient {
    pub fn new(transport: Transport, auto_number: bool) -> Self {
        Self {
            transport,
            auto_number,
            next_id: 1,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            supported_commands: None,
            interrupt_mode: InterruptMode::None,
            dead: None,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn IoObserver>) {
        self.observer = Some(observer);
    }

    /// Whether the session is still usable. Once false it never recovers.
    pub fn is_alive(&self) -> bool {
        self.dead.is_none()
    }

    /// Send a command and wait for its response payload.
    ///
    /// # Errors
    ///
    /// [`GtpError::Failure`] when the engine answers `?`;
    /// [`GtpError::Terminated`] when the process is or becomes dead.
    pub async fn send(&mut self, text: &str) -> Result<String, GtpError> {
        self.send_with_timeout(text, None, None).await
    }

    /// Send a command with a response deadline.
    ///
    /// A lapsed deadline does not itself fail the call: `callback` decides
    /// whether to keep waiting (the deadline restarts) or give up, in which
    /// case the process is killed and the call fails terminally. Without a
    /// callback, the first lapse gives up.
    pub async fn send_with_timeout(
        &mut self,
        text: &str,
        timeout: Option<Duration>,
        callback: Option<TimeoutCallback>,
    ) -> Result<String, GtpError> {
        self.drain_pending();

        if let Some(error) = &self.dead {
            return Err(error.clone());
        }

        let mut parsed = GtpCommand::new(text)?;
        let command_text = parsed.to_line();

        if self.auto_number {
            parsed = parsed.with_id(self.next_id);
            self.next_id += 1;
        }

        let line = parsed.to_line();
        debug!("Send: {line}");
        if let Some(observer) = &self.observer {
            observer.sent(&line);
        }

        if let Err(error) = self.transport.write_line(&line).await {
            self.dead = Some(error.clone());
            return Err(error);
        }

        let frame = self.wait_frame(timeout, callback).await?;
        let response = GtpResponse::parse(&frame)?;
        debug!("Receive: {}", response.raw());

        if let Some(observer) = &self.observer {
            observer.received(response.raw());
        }

        if let (Some(sent), Some(echoed)) = (parsed.id(), response.id())
            && sent != echoed
        {
            warn!("Response id {echoed} does not match command id {sent}");
        }

        if response.is_success() {
            Ok(response.payload().to_string())
        } else {
            Err(GtpError::Failure {
                command: command_text,
                message: response.payload().to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    async fn wait_frame(
        &mut self,
        timeout: Option<Duration>,
        callback: Option<TimeoutCallback>,
    ) -> Result<Vec<String>, GtpError> {
        loop {
            let event = match timeout {
                None => Some(self.transport.next_event().await),
                Some(limit) => self.transport.next_event_timeout(limit).await,
            };

            match event {
                Some(StreamEvent::Frame(lines)) => return Ok(lines),
                Some(StreamEvent::InvalidLine(line)) => self.notify_invalid_line(&line),
                Some(StreamEvent::Stderr(text)) => self.notify_stderr(&text),
                Some(StreamEvent::Eof) => return Err(self.mark_dead()),
                None => {
                    let keep_waiting = callback.as_ref().is_some_and(|decide| decide());
                    if !keep_waiting {
                        warn!("Response timeout lapsed, killing Go program");
                        self.transport.kill().await;
                        let error = GtpError::terminated(true);
                        self.dead = Some(error.clone());
                        return Err(error);
                    }
                }
            }
        }
    }

    /// Deliver queued diagnostics without blocking. Called on entry to every
    /// send so stderr printed between commands still reaches the observer.
    fn drain_pending(&mut self) {
        while let Some(event) = self.transport.try_next_event() {
            match event {
                StreamEvent::InvalidLine(line) => self.notify_invalid_line(&line),
                StreamEvent::Stderr(text) => self.notify_stderr(&text),
                StreamEvent::Frame(lines) => {
                    warn!("Discarding unexpected response frame: {}", lines.join(" "));
                }
                StreamEvent::Eof => {
                    let _ = self.mark_dead();
                }
            }
        }
    }

    fn notify_invalid_line(&self, line: &str) {
        warn!("Invalid engine output: {line}");
        if let Some(observer) = &self.observer {
            observer.invalid_line(line);
        }
    }

    fn notify_stderr(&self, text: &str) {
        if let Some(observer) = &self.observer {
            observer.stderr(text);
        }
    }

    #[track_caller]
    fn mark_dead(&mut self) -> GtpError {
        let error = self
            .dead
            .clone()
            .unwrap_or_else(|| GtpError::terminated(self.transport.was_killed()));
        self.dead = Some(error.clone());
        error
    }

    /// Query `protocol_version`. Engines predating the command keep the
    /// default of 2; an engine that answers must say exactly "1" or "2".
    ///
    /// # Errors
    ///
    /// [`GtpError::Protocol`] for any other answer; process death
    /// propagates unchanged.
    pub async fn query_protocol_version(&mut self) -> Result<u32, GtpError> {
        let response = match self.send("protocol_version").await {
            Ok(text) => text,
            Err(GtpError::Failure { .. }) => {
                debug!("Engine lacks protocol_version, assuming {DEFAULT_PROTOCOL_VERSION}");
                self.protocol_version = DEFAULT_PROTOCOL_VERSION;
                return Ok(DEFAULT_PROTOCOL_VERSION);
            }
            Err(error) => return Err(error),
        };

        match response.trim() {
            "1" => self.protocol_version = 1,
            "2" => self.protocol_version = 2,
            other => {
                return Err(GtpError::Protocol {
                    message: format!("Invalid protocol_version response: {other}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(self.protocol_version)
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Query and cache the supported-command set (`list_commands`, or
    /// `help` for protocol version 1).
    pub async fn query_supported_commands(&mut self) -> Result<(), GtpError> {
        let command = if self.protocol_version == 1 {
            "help"
        } else {
            "list_commands"
        };

        let response = self.send(command).await?;
        let names: HashSet<String> = response
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        info!("Engine supports {} commands", names.len());
        self.supported_commands = Some(names);
        Ok(())
    }

    /// Whether the engine listed `name` in its supported commands. False
    /// when the set was never successfully queried.
    pub fn is_supported(&self, name: &str) -> bool {
        self.supported_commands
            .as_ref()
            .is_some_and(|commands| commands.contains(name))
    }

    pub fn supported_commands(&self) -> Option<&HashSet<String>> {
        self.supported_commands.as_ref()
    }

    /// Probe interrupt support in priority order: the `gogui-interrupt`
    /// comment-line protocol, then `gogui-sigint` answering a process id.
    /// Absence of both means killing the program is the only option.
    ///
    /// # Errors
    ///
    /// Only process death propagates; a failed or malformed probe degrades
    /// to [`InterruptMode::None`].
    pub async fn query_interrupt_support(&mut self) -> Result<InterruptMode, GtpError> {
        self.interrupt_mode = InterruptMode::None;

        if self.is_supported("gogui-interrupt") {
            self.interrupt_mode = InterruptMode::CommentLine;
        } else if self.is_supported("gogui-sigint") {
            match self.send("gogui-sigint").await {
                Ok(text) => match text.trim().parse::<u32>() {
                    Ok(pid) => self.interrupt_mode = InterruptMode::Signal { pid },
                    Err(_) => warn!("Invalid gogui-sigint response: {text}"),
                },
                Err(GtpError::Failure { message, .. }) => {
                    debug!("gogui-sigint probe failed: {message}");
                }
                Err(error) => return Err(error),
            }
        }

        Ok(self.interrupt_mode)
    }

    pub fn interrupt_mode(&self) -> InterruptMode {
        self.interrupt_mode
    }

    /// Ask the engine to finish the outstanding command early.
    ///
    /// Comment mode writes the `# interrupt` line, unnumbered and with no
    /// response wait; signal mode delivers SIGINT to the probed pid. The
    /// outstanding command's response is still awaited by its caller.
    ///
    /// # Errors
    ///
    /// [`GtpError::Unsupported`] when neither mode is available.
    pub async fn send_interrupt(&mut self) -> Result<(), GtpError> {
        if let Some(error) = &self.dead {
            return Err(error.clone());
        }

        match self.interrupt_mode {
            InterruptMode::CommentLine => self.send_comment(INTERRUPT_COMMENT_LINE).await,
            InterruptMode::Signal { pid } => signal_interrupt(pid).await,
            InterruptMode::None => Err(GtpError::Unsupported {
                message: String::from("Engine does not support interruption"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Write a comment line. Comments are never numbered and never produce
    /// a response frame.
    pub async fn send_comment(&mut self, line: &str) -> Result<(), GtpError> {
        debug_assert!(line.starts_with('#'));

        if let Some(observer) = &self.observer {
            observer.sent(line);
        }

        if let Err(error) = self.transport.write_line(line).await {
            self.dead = Some(error.clone());
            return Err(error);
        }

        Ok(())
    }

    /// The generate-move command for the active protocol version.
    pub fn command_genmove(&self, color: Color) -> String {
        util::command_genmove(self.protocol_version, color)
    }

    /// The play command for the active protocol version.
    pub fn command_play(&self, placement: &Placement) -> String {
        util::command_play(self.protocol_version, placement)
    }

    /// The board-clearing command sequence for the active protocol version.
    pub fn commands_clear_board(&self, size: u32) -> Vec<String> {
        util::commands_clear_board(self.protocol_version, size)
    }

    /// Cloneable write/kill surface for interrupt delivery from another
    /// task while this client waits on a response.
    pub fn transport_handle(&self) -> TransportHandle {
        self.transport.handle()
    }

    /// See [`Transport::close_input`].
    pub async fn close_input(&self) {
        self.transport.close_input().await;
    }

    /// Kill the engine process and mark the session dead.
    pub async fn kill(&mut self) {
        self.transport.kill().await;
        if self.dead.is_none() {
            self.dead = Some(GtpError::terminated(true));
        }
    }

    /// See [`Transport::wait_exit`].
    pub async fn wait_exit(&self, limit: Duration) -> bool {
        self.transport.wait_exit(limit).await
    }

    pub fn pid(&self) -> Option<u32> {
        self.transport.pid()
    }
}

/// Deliver SIGINT to the engine's probed process id.
#[cfg(unix)]
pub(crate) async fn signal_interrupt(pid: u32) -> Result<(), GtpError> {
    use tokio::process::Command as TokioCommand;

    info!("Sending SIGINT to Go program (PID: {pid})");

    let status = TokioCommand::new("kill")
        .arg("-INT")
        .arg(pid.to_string())
        .status()
        .await;

    match status {
        Ok(code) if code.success() => Ok(()),
        Ok(code) => Err(GtpError::Failure {
            command: format!("kill -INT {pid}"),
            message: format!("Interrupt delivery failed: {code}"),
            location: ErrorLocation::from(Location::caller()),
        }),
        Err(error) => Err(GtpError::Failure {
            command: format!("kill -INT {pid}"),
            message: format!("Interrupt delivery failed: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

#[cfg(not(unix))]
pub(crate) async fn signal_interrupt(_pid: u32) -> Result<(), GtpError> {
    Err(GtpError::Unsupported {
        message: String::from("Signal interrupts are only available on Unix"),
        location: ErrorLocation::from(Location::caller()),
    })
}
