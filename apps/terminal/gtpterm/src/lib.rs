//! Terminal GTP relay.
//!
//! Attaches a Go engine and forwards GTP commands typed on stdin, printing
//! the engine's responses on stdout. The relay is itself a well-formed GTP
//! peer: responses are re-framed on the way out, and engine stderr is
//! passed through to the relay's stderr.

pub mod error;
pub mod logger;
pub mod shell;
