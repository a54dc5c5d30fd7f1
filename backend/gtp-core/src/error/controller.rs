use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ControllerError {
    #[error("State Error: {message} {location}")]
    InvalidState {
        message: String,
        location: ErrorLocation,
    },

    #[error("Command Guard Error: {message} {location}")]
    StateChanging {
        message: String,
        location: ErrorLocation,
    },
}
