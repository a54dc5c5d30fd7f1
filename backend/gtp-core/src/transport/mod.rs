//! Child-process transport for engine communication.
//!
//! Owns the engine process and its three standard streams and provides
//! line-level I/O without any knowledge of GTP semantics. Each stream is
//! read by a dedicated background task; both tasks feed one ordered event
//! queue, and the consumer only ever blocks on dequeuing, never on the OS
//! stream itself.

pub(crate) mod reader;
pub mod spawn;

pub use spawn::split_command_line;

use crate::error::gtp::GtpError;
use crate::error::spawn::SpawnError;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::Child as TokioChild;
use tokio::spawn as TokioSpawn;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::timeout as tokio_timeout;

/// One message from the background stream readers.
#[derive(Debug)]
pub enum StreamEvent {
    /// A complete response frame: the raw lines from the status line up to,
    /// excluding, the terminating blank line.
    Frame(Vec<String>),
    /// A stdout line read outside any response frame. Diagnostic, non-fatal.
    InvalidLine(String),
    /// A chunk of stderr output.
    Stderr(String),
    /// The engine's stdout reached end of stream.
    Eof,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable write/kill surface of a transport.
///
/// Lets an interrupt be delivered while the owning client is blocked
/// waiting for a response on the main path.
#[derive(Clone)]
pub struct TransportHandle {
    writer: Arc<Mutex<Option<BoxedWriter>>>,
    child: Option<Arc<Mutex<TokioChild>>>,
    was_killed: Arc<AtomicBool>,
    pid: Option<u32>,
}

impl TransportHandle {
    /// Write one line and flush.
    ///
    /// # Errors
    ///
    /// Returns [`GtpError::Terminated`] if the stream is closed or the
    /// flush fails because the peer has exited.
    pub async fn write_line(&self, line: &str) -> Result<(), GtpError> {
        let mut guard = self.writer.lock().await;

        let Some(writer) = guard.as_mut() else {
            return Err(GtpError::terminated(self.was_killed()));
        };

        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        if let Err(error) = writer.write_all(&bytes).await {
            warn!("Write to Go program failed: {error}");
            return Err(GtpError::terminated(self.was_killed()));
        }

        if let Err(error) = writer.flush().await {
            warn!("Flush to Go program failed: {error}");
            return Err(GtpError::terminated(self.was_killed()));
        }

        Ok(())
    }

    /// Close the outgoing stream only, letting the engine see EOF and exit
    /// on its own.
    pub async fn close_input(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            let _ = writer.shutdown().await;
        }
    }

    /// Forcibly terminate the process.
    ///
    /// Marks the transport as intentionally killed so the subsequent death
    /// is reported as "terminated" rather than a crash.
    pub async fn kill(&self) {
        self.was_killed.store(true, Ordering::SeqCst);
        self.close_input().await;

        if let Some(child) = &self.child {
            let mut guard = child.lock().await;
            if let Err(error) = guard.kill().await {
                debug!("Kill failed (process already exited?): {error}");
            }
        }
    }

    pub fn was_killed(&self) -> bool {
        self.was_killed.load(Ordering::SeqCst)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// The engine process plus the ordered event queue over its output streams.
pub struct Transport {
    handle: TransportHandle,
    events: UnboundedReceiver<StreamEvent>,
}

impl Transport {
    /// Launch an engine process and wire up its streams.
    ///
    /// The command line is split respecting quoting and a `%SRAND` token is
    /// replaced by a random seed. Must be called within a tokio runtime;
    /// two reader tasks are spawned immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] if the command line is malformed or the
    /// process cannot be started.
    pub fn start(command_line: &str, working_dir: Option<&Path>) -> Result<Self, SpawnError> {
        let mut child = spawn::spawn_engine_process(command_line, working_dir)?;
        let pid = child.id();

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (events_tx, events_rx) = unbounded_channel();

        if let Some(stdout) = stdout {
            TokioSpawn(reader::read_responses(stdout, events_tx.clone()));
        }

        if let Some(stderr) = stderr {
            TokioSpawn(reader::read_stderr(stderr, events_tx));
        }

        let writer: Option<BoxedWriter> = stdin.map(|s| Box::new(s) as BoxedWriter);

        Ok(Self {
            handle: TransportHandle {
                writer: Arc::new(Mutex::new(writer)),
                child: Some(Arc::new(Mutex::new(child))),
                was_killed: Arc::new(AtomicBool::new(false)),
                pid,
            },
            events: events_rx,
        })
    }

    /// Build a transport over arbitrary streams instead of a child process.
    ///
    /// Test seam: lets protocol and synchronizer logic run against an
    /// in-process engine connected through `tokio::io::duplex`.
    pub fn from_streams(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        TokioSpawn(reader::read_responses(reader, events_tx));

        Self {
            handle: TransportHandle {
                writer: Arc::new(Mutex::new(Some(Box::new(writer) as BoxedWriter))),
                child: None,
                was_killed: Arc::new(AtomicBool::new(false)),
                pid: None,
            },
            events: events_rx,
        }
    }

    /// Cloneable write/kill surface for interrupt delivery.
    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// See [`TransportHandle::write_line`].
    pub async fn write_line(&self, line: &str) -> Result<(), GtpError> {
        self.handle.write_line(line).await
    }

    /// Dequeue the next event, waiting for it.
    ///
    /// A closed queue (both readers gone) is reported as [`StreamEvent::Eof`].
    pub async fn next_event(&mut self) -> StreamEvent {
        self.events.recv().await.unwrap_or(StreamEvent::Eof)
    }

    /// Dequeue the next event or return `None` once `limit` elapses.
    pub async fn next_event_timeout(&mut self, limit: Duration) -> Option<StreamEvent> {
        match tokio_timeout(limit, self.events.recv()).await {
            Ok(event) => Some(event.unwrap_or(StreamEvent::Eof)),
            Err(_) => None,
        }
    }

    /// Dequeue an already-arrived event without waiting.
    pub fn try_next_event(&mut self) -> Option<StreamEvent> {
        self.events.try_recv().ok()
    }

    /// See [`TransportHandle::close_input`].
    pub async fn close_input(&self) {
        self.handle.close_input().await;
    }

    /// See [`TransportHandle::kill`].
    pub async fn kill(&self) {
        self.handle.kill().await;
    }

    /// Wait for process exit, bounded by `limit`. Returns whether the
    /// process is known to be gone.
    pub async fn wait_exit(&self, limit: Duration) -> bool {
        let Some(child) = &self.handle.child else {
            return true;
        };

        let mut guard = child.lock().await;
        match tokio_timeout(limit, guard.wait()).await {
            Ok(Ok(status)) => {
                debug!("Go program exited: {status}");
                true
            }
            Ok(Err(error)) => {
                warn!("Waiting for Go program failed: {error}");
                true
            }
            Err(_) => false,
        }
    }

    pub fn was_killed(&self) -> bool {
        self.handle.was_killed()
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }
}
