//! Error taxonomy shared by every pipeline stage.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::tool::ToolError;

/// Errors that can abort a run.
///
/// No stage recovers from these locally; the driver propagates the first one
/// and leaves whatever the build directory already holds in place.
#[derive(Error, Debug)]
pub enum Error {
    /// A required external process could not be found, launched, or exited non-zero.
    #[error(transparent)]
    ExternalTool(#[from] ToolError),

    /// The bibliography file is not well-formed BibTeX.
    #[error("malformed bibliography '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// An entry lacks a field the partitioner needs.
    #[error("entry '{key}' has no '{field}' field")]
    MissingField { key: String, field: &'static str },

    /// An entry's year field is present but not an integer.
    #[error("entry '{key}' has a year that is not an integer: '{value}'")]
    InvalidYear { key: String, value: String },

    /// A filesystem operation failed.
    #[error("{context} '{}': {source}", path.display())]
    Filesystem {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No input files were given, or none were found in the input directory.
    #[error(
        "no input bibliography files{}",
        dir.as_ref().map(|d| format!(" found in '{}'", d.display())).unwrap_or_default()
    )]
    NoInputs { dir: Option<PathBuf> },

    /// The output name is not a plain file name.
    #[error("output name '{name}' must be a file name without directories")]
    InvalidOutputName { name: String },
}

impl Error {
    /// Builds a [`Error::Filesystem`] from an io error and the path it concerns.
    pub fn fs(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            context,
            path: path.into(),
            source,
        }
    }
}
