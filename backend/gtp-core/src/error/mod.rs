pub mod controller;
pub mod gtp;
pub mod spawn;

pub use controller::ControllerError;
pub use gtp::GtpError;
pub use spawn::SpawnError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Spawn(#[from] spawn::SpawnError),

    #[error(transparent)]
    Gtp(#[from] gtp::GtpError),

    #[error(transparent)]
    Controller(#[from] controller::ControllerError),
}
