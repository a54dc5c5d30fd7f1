use common::ErrorLocation;

use gtp_core::error::CoreError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GtptermError {
    /// Error from this application (arguments, terminal I/O, logging).
    #[error("Gtpterm Error: {message} {location}")]
    Gtpterm {
        message: String,
        location: ErrorLocation,
    },

    /// Error from gtp-core operations (spawn, protocol, lifecycle).
    #[error(transparent)]
    Core(#[from] CoreError),
}
