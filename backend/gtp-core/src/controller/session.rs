//! Attached-engine session data.

use crate::protocol::InterruptMode;

use std::collections::HashSet;

/// Identity and capabilities of an attached engine.
///
/// Built during the attach handshake and immutable afterwards; liveness is
/// tracked by the controller state machine, not here.
#[derive(Debug, Clone)]
pub struct EngineSession {
    /// Engine-reported name, when the `name` command is supported.
    pub name: Option<String>,
    /// Engine-reported version string, when supported.
    pub version: Option<String>,
    /// GTP protocol version, 1 or 2.
    pub protocol_version: u32,
    /// Commands the engine listed; empty when the query failed.
    pub supported_commands: HashSet<String>,
    /// How (and whether) the engine can be interrupted.
    pub interrupt_mode: InterruptMode,
    /// Process id of the engine child.
    pub pid: Option<u32>,
}

impl EngineSession {
    pub fn is_supported(&self, name: &str) -> bool {
        self.supported_commands.contains(name)
    }
}
