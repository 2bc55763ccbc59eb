use std::io;
use std::result;

use thiserror::Error;

use crate::axes::Axis;

/// Boxed error coming out of the underlying array-I/O library.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open dataset {path:?}: {source}")]
    DatasetUnreadable {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("failed reading {variable:?}: {source}")]
    DatasetReadError {
        variable: String,
        #[source]
        source: SourceError,
    },

    #[error("no variable named {0:?} in dataset")]
    UnknownVariable(String),

    #[error("{0:?} is not a dimension of the active variable")]
    UnknownCoordinate(String),

    #[error("coordinate {coordinate:?} is already assigned to axis {assigned}")]
    DuplicateAxisAssignment { coordinate: String, assigned: Axis },

    #[error("slice step must be a positive integer, got {0}")]
    InvalidStep(String),

    #[error("invalid bound for coordinate {coordinate:?}: {reason}")]
    InvalidBound { coordinate: String, reason: String },

    #[error("time index {index} is out of range for coordinate of length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    #[error("selection is incomplete: {0}")]
    IncompleteSelection(&'static str),

    #[error("configuration is missing required field {0:?}")]
    MissingRequiredField(&'static str),

    #[error("invalid configuration at {step}: {source}")]
    InvalidConfiguration {
        step: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an error raised while applying one step of a configuration import.
    ///
    pub(crate) fn during<S: Into<String>>(step: S) -> impl FnOnce(Error) -> Error {
        let step = step.into();
        move |err| Error::InvalidConfiguration {
            step,
            source: Box::new(err),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
