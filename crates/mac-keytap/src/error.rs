//! Error types and result alias for the mac-keytap crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Event tap could not be created or attached to a run loop.
    #[error("Event tap failed to start")]
    EventTapStart,
    /// Missing or denied system permission.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),
    /// The tap thread exited before reporting readiness.
    #[error("Event tap thread exited during startup")]
    ThreadExited,
}
