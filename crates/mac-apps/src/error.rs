use thiserror::Error;

/// Errors that can occur during application and window operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Accessibility permission is required but not granted.
    #[error("Accessibility permission missing")]
    Permission,

    /// Failed to create an Accessibility API application element.
    #[error("Failed to create AX application element")]
    AppElement,

    /// An Accessibility API operation failed with the given error code.
    #[error("AX operation failed: code {0}")]
    AxCode(i32),

    /// The AX element became invalid (e.g., window closed) during the operation.
    #[error("AX element invalid (window gone)")]
    WindowGone,

    /// The requested window does not exist.
    #[error("No such window")]
    NoWindow,

    /// Operation must be executed on the main thread.
    #[error("Operation requires main thread")]
    MainThread,

    /// No running process has the given pid.
    #[error("Process {0} not running")]
    NotRunning(i32),

    /// Failed to activate the application.
    #[error("Activation failed for pid {0}")]
    ActivationFailed(i32),

    /// Launching or reopening an application failed.
    #[error("Failed to open {bundle_id}: {reason}")]
    Open {
        /// Target bundle identifier.
        bundle_id: String,
        /// Failure description.
        reason: String,
    },

    /// The Dock configuration could not be read.
    #[error("Failed to read Dock items: {0}")]
    Dock(String),

    /// An application icon could not be loaded or decoded.
    #[error("Icon unavailable: {0}")]
    Icon(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
