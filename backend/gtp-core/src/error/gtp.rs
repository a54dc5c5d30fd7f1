use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Command-level and session-level protocol failures.
///
/// `Clone` on purpose: once a session is dead, the same terminal error is
/// returned from every subsequent call without touching the process.
#[derive(Debug, Clone, ThisError)]
pub enum GtpError {
    /// The engine answered with `?` status. Carries the offending command.
    #[error("Command Error: {command}: {message} {location}")]
    Failure {
        command: String,
        message: String,
        location: ErrorLocation,
    },

    /// The engine process is gone. Sticky and terminal for the session.
    #[error("Process Error: {message} {location}")]
    Terminated {
        message: String,
        location: ErrorLocation,
    },

    /// A response or capability answer violated the protocol.
    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    /// A command rejected before it reached the wire.
    #[error("Invalid Command Error: {message} {location}")]
    InvalidCommand {
        message: String,
        location: ErrorLocation,
    },

    /// The engine lacks a capability the operation requires.
    #[error("Unsupported Error: {message} {location}")]
    Unsupported {
        message: String,
        location: ErrorLocation,
    },

    /// The synchronizer's mirror no longer matches the engine; only a full
    /// initialization may be attempted next.
    #[error("Out Of Sync Error: {message} {location}")]
    OutOfSync {
        message: String,
        location: ErrorLocation,
    },
}

impl GtpError {
    /// Terminal process-death error. The wording distinguishes an
    /// intentional kill from a crash.
    #[track_caller]
    pub(crate) fn terminated(killed: bool) -> Self {
        let message = if killed {
            "The Go program terminated"
        } else {
            "The Go program terminated unexpectedly"
        };

        GtpError::Terminated {
            message: String::from(message),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
