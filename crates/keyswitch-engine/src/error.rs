use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the switcher engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An OS backend call failed; the message comes from the backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The target process has exited.
    #[error("Process {0} is not running")]
    NotRunning(i32),

    /// The queried window does not exist.
    #[error("No such window")]
    NoWindow,

    /// Launching an application failed.
    #[error("Failed to launch {bundle_id}: {reason}")]
    Launch {
        /// Bundle identifier that failed to launch.
        bundle_id: String,
        /// Backend reason.
        reason: String,
    },

    /// Preferences could not be loaded or saved.
    #[error("Preferences error: {0}")]
    Config(String),
}

impl From<config::Error> for Error {
    fn from(e: config::Error) -> Self {
        Self::Config(e.to_string())
    }
}
