// Shared test doubles: an in-process engine served over duplex streams and
// a board implementing the rules-provider seam.

use crate::engine::{CommandHandler, EngineCommand, serve};
use crate::protocol::GtpClient;
use crate::sync::BoardView;
use crate::transport::Transport;

use common::{Color, Placement, Point};

use std::mem::take;
use std::sync::{Arc, Mutex};

use tokio::io::{duplex, split};

/// Command log shared with a running engine double.
pub(crate) type CommandLog = Arc<Mutex<Vec<String>>>;

/// Scripted engine: answers capability queries from its table and records
/// every command it executes, ids stripped.
pub(crate) struct ScriptedEngine {
    supported: Vec<String>,
    fail_on: Vec<String>,
    protocol_version: &'static str,
    log: CommandLog,
}

impl ScriptedEngine {
    pub(crate) fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(|name| name.to_string()).collect(),
            fail_on: Vec::new(),
            protocol_version: "2",
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer `name` with a `?` failure.
    pub(crate) fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.push(name.to_string());
        self
    }

    pub(crate) fn with_protocol_version(mut self, version: &'static str) -> Self {
        self.protocol_version = version;
        self
    }

    pub(crate) fn log(&self) -> CommandLog {
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

        if self.fail_on.iter().any(|name| name == command.name()) {
            return Err(String::from("scripted failure"));
        }

        match command.name() {
            "protocol_version" => Ok(self.protocol_version.to_string()),
            "list_commands" | "help" => Ok(self.supported.join("\n")),
            "name" => Ok(String::from("scripted")),
            "version" => Ok(String::from("1.0")),
            _ => Ok(String::new()),
        }
    }
}

/// Connect a client to an engine double running in a background task.
pub(crate) async fn connect(engine: ScriptedEngine) -> GtpClient {
    let (client_side, engine_side) = duplex(64 * 1024);
    let (engine_read, engine_write) = split(engine_side);

    tokio::spawn(async move {
        let mut engine = engine;
        let _ = serve(engine_read, engine_write, &mut engine).await;
    });

    let (client_read, client_write) = split(client_side);
    GtpClient::new(Transport::from_streams(client_read, client_write), true)
}

/// Connect and run the handshake queries the synchronizer depends on.
pub(crate) async fn connect_with_capabilities(engine: ScriptedEngine) -> GtpClient {
    let mut client = connect(engine).await;
    client
        .query_protocol_version()
        .await
        .expect("protocol_version");
    client
        .query_supported_commands()
        .await
        .expect("list_commands");
    client
}

/// Take and clear the recorded commands.
pub(crate) fn drain(log: &CommandLog) -> Vec<String> {
    let mut guard = log.lock().expect("log lock");
    take(&mut *guard)
}

/// Board double implementing the rules-provider seam.
pub(crate) struct TestBoard {
    size: u32,
    placements: Vec<Placement>,
    capture_points: Vec<Point>,
}

impl TestBoard {
    pub(crate) fn new(size: u32, placements: Vec<Placement>) -> Self {
        Self {
            size,
            placements,
            capture_points: Vec::new(),
        }
    }

    /// Declare `vertex` a point where a replayed move would capture or be
    /// suicide.
    pub(crate) fn with_capture_at(mut self, vertex: &str) -> Self {
        self.capture_points
            .push(Point::parse_gtp(vertex).expect("vertex"));
        self
    }
}

impl BoardView for TestBoard {
    fn size(&self) -> u32 {
        self.size
    }

    fn placements(&self) -> &[Placement] {
        &self.placements
    }

    fn is_capture_or_suicide(&self, point: Point, _color: Color) -> bool {
        self.capture_points.contains(&point)
    }
}

pub(crate) fn play(color: Color, vertex: &str) -> Placement {
    Placement::play(color, Some(Point::parse_gtp(vertex).expect("vertex")))
}

pub(crate) fn setup(color: Color, vertex: &str) -> Placement {
    Placement::setup(color, Point::parse_gtp(vertex).expect("vertex"))
}
