//! Error types for the scenery crate.

use std::fmt;
use std::path::PathBuf;

use crate::bucket::GridCell;

/// Result type for scenery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or feeding the tile manager.
///
/// Only construction-time problems and loader failures are represented here.
/// Runtime conditions inside a frame (batch overflow, stale references,
/// missing tiles) are reported through sentinel returns and logging.
#[derive(Debug)]
pub enum Error {
    /// Configuration rejected at startup.
    Config {
        /// Description of the offending setting.
        detail: String,
    },
    /// Reading a file failed.
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The error message.
        message: String,
    },
    /// A material properties source could not be parsed.
    MaterialParse {
        /// One-based line number of the offending line.
        line: usize,
        /// Description of what was wrong.
        detail: String,
    },
    /// A material with the same name is already registered.
    DuplicateMaterial {
        /// The clashing name.
        name: String,
    },
    /// A tile loader could not build geometry for a cell.
    Load {
        /// The cell being loaded.
        cell: GridCell,
        /// The error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { detail } => write!(f, "invalid configuration: {detail}"),
            Error::Io { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
            Error::MaterialParse { line, detail } => {
                write!(f, "material properties line {line}: {detail}")
            }
            Error::DuplicateMaterial { name } => {
                write!(f, "material `{name}` is already registered")
            }
            Error::Load { cell, message } => write!(f, "failed to load tile {cell}: {message}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Build an [`Error::Config`] from anything displayable.
    pub(crate) fn config(detail: impl Into<String>) -> Self {
        Error::Config {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::MaterialParse {
            line: 12,
            detail: "expected `key = value`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "material properties line 12: expected `key = value`"
        );

        let err = Error::Load {
            cell: GridCell::new(-123, 37, 3, 5),
            message: "no such file".to_string(),
        };
        assert_eq!(err.to_string(), "failed to load tile -123,37:3,5: no such file");
    }
}
