//! Test helpers: in-process GTP engine doubles over duplex streams and a
//! spawned shell-script engine for real process-lifecycle coverage.

use gtp_core::engine::{CommandHandler, EngineCommand, serve};
use gtp_core::protocol::GtpClient;
use gtp_core::sync::BoardView;
use gtp_core::transport::Transport;

use common::{Color, Placement, Point};

use std::io::Write as IoWrite;
use std::mem::take;
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex, split};

/// Lines or commands shared with a running engine double.
pub type CommandLog = Arc<Mutex<Vec<String>>>;

/// Take and clear the recorded entries.
pub fn drain(log: &CommandLog) -> Vec<String> {
    let mut guard = log.lock().expect("log lock");
    take(&mut *guard)
}

/// What a raw engine double does with one input line.
pub enum RawReply {
    /// Write these bytes verbatim (a full frame, or deliberate garbage).
    Respond(String),
    /// Say nothing (comments, or a deliberately hung command).
    Silent,
    /// Drop both stream halves, simulating engine death.
    Close,
}

/// Line-level engine double: records every input line verbatim and answers
/// through the responder. Gives tests full control over framing.
pub async fn connect_raw<F>(mut responder: F) -> (GtpClient, CommandLog)
where
    F: FnMut(&str) -> RawReply + Send + 'static,
{
    let (client_side, engine_side) = duplex(64 * 1024);
    let lines_log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let log_clone = Arc::clone(&lines_log);
    let (engine_read, mut engine_write) = split(engine_side);

    tokio::spawn(async move {
        let mut lines = BufReader::new(engine_read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log_clone.lock().expect("log lock").push(line.clone());
            match responder(&line) {
                RawReply::Respond(text) => {
                    if engine_write.write_all(text.as_bytes()).await.is_err() {
                        break;
                    }
                    let _ = engine_write.flush().await;
                }
                RawReply::Silent => {}
                RawReply::Close => break,
            }
        }
    });

    let (client_read, client_write) = split(client_side);
    let client = GtpClient::new(Transport::from_streams(client_read, client_write), true);
    (client, lines_log)
}

/// Strip the auto-assigned id from a recorded request line.
pub fn without_id(line: &str) -> String {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens
        .first()
        .is_some_and(|first| first.parse::<u32>().is_ok())
    {
        tokens.remove(0);
    }
    tokens.join(" ")
}

/// Command-level engine double built on the crate's own engine-side
/// framing.
pub struct ScriptedEngine {
    supported: Vec<String>,
    log: CommandLog,
}

impl ScriptedEngine {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(|name| name.to_string()).collect(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }
}

impl CommandHandler for ScriptedEngine {
    fn handle(&mut self, command: &EngineCommand) -> Result<String, String> {
        let mut text = command.name().to_string();
        for argument in command.arguments() {
            text.push(' ');
            text.push_str(argument);
        }
        self.log.lock().expect("log lock").push(text);

        match command.name() {
            "protocol_version" => Ok(String::from("2")),
            "list_commands" => Ok(self.supported.join("\n")),
            "name" => Ok(String::from("scripted")),
            "version" => Ok(String::from("1.0")),
            "genmove" => Ok(String::from("C3")),
            _ => Ok(String::new()),
        }
    }
}

/// Connect a client to a [`ScriptedEngine`] running in a background task.
pub async fn connect(engine: ScriptedEngine) -> GtpClient {
    let (client_side, engine_side) = duplex(64 * 1024);
    let (engine_read, engine_write) = split(engine_side);

    tokio::spawn(async move {
        let mut engine = engine;
        let _ = serve(engine_read, engine_write, &mut engine).await;
    });

    let (client_read, client_write) = split(client_side);
    GtpClient::new(Transport::from_streams(client_read, client_write), true)
}

/// A POSIX shell GTP engine written to a temp file, for tests that need a
/// real child process. Returns the guard keeping the file alive and the
/// command line to launch it.
pub fn well_behaved_engine_script() -> (NamedTempFile, String) {
    engine_script_answering_genmove("C3")
}

/// Like [`well_behaved_engine_script`], but every genmove is answered with
/// a resignation.
pub fn resigning_engine_script() -> (NamedTempFile, String) {
    engine_script_answering_genmove("resign")
}

/// Like [`well_behaved_engine_script`], but every genmove is answered with
/// a pass.
pub fn passing_engine_script() -> (NamedTempFile, String) {
    engine_script_answering_genmove("PASS")
}

fn engine_script_answering_genmove(answer: &str) -> (NamedTempFile, String) {
    let script = format!(
        r##"#!/bin/sh
while IFS= read -r line; do
  set -- $line
  [ $# -eq 0 ] && continue
  id=""
  case "$1" in
    "#"*) continue ;;
  esac
  case "$1" in
    [0-9]*) id=$1; shift ;;
  esac
  case "$1" in
    protocol_version) printf '=%s 2\n\n' "$id" ;;
    name) printf '=%s scripted\n\n' "$id" ;;
    version) printf '=%s 1.0\n\n' "$id" ;;
    list_commands) printf '=%s play\nundo\nboardsize\nclear_board\nshowboard\nquit\n\n' "$id" ;;
    genmove) printf '=%s {answer}\n\n' "$id" ;;
    die) exit 0 ;;
    quit) printf '=%s\n\n' "$id"; exit 0 ;;
    *) printf '=%s\n\n' "$id" ;;
  esac
done
"##,
        answer = answer
    );
    script_engine(&script)
}

/// An engine process that exits before answering anything.
pub fn dying_engine_script() -> (NamedTempFile, String) {
    script_engine("#!/bin/sh\nexit 0\n")
}

fn script_engine(script: &str) -> (NamedTempFile, String) {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(script.as_bytes()).expect("write script");
    file.flush().expect("flush script");

    let command_line = format!("sh {}", file.path().display());
    (file, command_line)
}

/// Board double for controller tests.
pub struct TestBoard {
    size: u32,
    placements: Vec<Placement>,
}

impl TestBoard {
    pub fn empty(size: u32) -> Self {
        Self {
            size,
            placements: Vec::new(),
        }
    }
}

impl BoardView for TestBoard {
    fn size(&self) -> u32 {
        self.size
    }

    fn placements(&self) -> &[Placement] {
        &self.placements
    }

    fn is_capture_or_suicide(&self, _point: Point, _color: Color) -> bool {
        false
    }
}
