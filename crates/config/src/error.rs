//! Error types for preferences and statistics persistence.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while loading, validating, or saving preferences and statistics.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// The file exists but could not be decoded.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// Decoder message, including the position when the format reports one.
        message: String,
    },
    #[error("{}", problems.join("; "))]
    /// One or more semantic problems with otherwise well-formed preferences.
    Validation {
        /// Optional path associated with the validation error.
        path: Option<PathBuf>,
        /// Every problem found, in field order.
        problems: Vec<String>,
    },
    #[error("{message}")]
    /// Persisting to disk failed.
    Write {
        /// Destination path.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly error message including the path when known.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse { path, message } => match path {
                Some(p) => format!("Preferences parse error at {}\n{}", p.display(), message),
                None => format!("Preferences parse error\n{}", message),
            },
            Self::Validation { path, problems } => {
                let body: String = problems.iter().map(|p| format!("  - {p}\n")).collect();
                match path {
                    Some(p) => format!("Preferences validation error at {}\n{}", p.display(), body),
                    None => format!("Preferences validation error\n{}", body),
                }
            }
            Self::Write { path, message } => {
                format!("Write error at {}: {}", path.display(), message)
            }
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                path.as_deref()
            }
            Self::Write { path, .. } => Some(path),
        }
    }

    /// Attach `path` to an error that does not carry one yet.
    pub(crate) fn with_path(self, p: &Path) -> Self {
        match self {
            Self::Read { path: None, message } => Self::Read {
                path: Some(p.to_path_buf()),
                message,
            },
            Self::Parse { path: None, message } => Self::Parse {
                path: Some(p.to_path_buf()),
                message,
            },
            Self::Validation {
                path: None,
                problems,
            } => Self::Validation {
                path: Some(p.to_path_buf()),
                problems,
            },
            other => other,
        }
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_lists_every_problem() {
        let e = Error::Validation {
            path: Some(PathBuf::from("/tmp/p.ron")),
            problems: vec!["a".into(), "b".into()],
        };
        let s = e.pretty();
        assert!(s.starts_with("Preferences validation error at /tmp/p.ron"));
        assert!(s.contains("  - a\n"));
        assert!(s.contains("  - b\n"));
        assert_eq!(e.to_string(), "a; b");
    }

    #[test]
    fn with_path_keeps_existing_path() {
        let e = Error::Read {
            path: Some(PathBuf::from("/a")),
            message: "x".into(),
        }
        .with_path(Path::new("/b"));
        assert_eq!(e.path(), Some(Path::new("/a")));
        let e = Error::Parse {
            path: None,
            message: "x".into(),
        }
        .with_path(Path::new("/b"));
        assert_eq!(e.path(), Some(Path::new("/b")));
    }
}
