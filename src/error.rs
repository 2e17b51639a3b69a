//! Error handling for the importer.

use std::error::Error as StdError;
use std::fmt;

use crate::engine::EngineError;

/// Errors surfaced by the importer.
///
/// End of stream and description changes are not errors; they travel on the
/// success channel as [`AccessUnit`](crate::AccessUnit) variants.
#[derive(Debug)]
pub enum Error {
    /// The engine could not allocate what it needed.
    MemoryExhausted,

    /// The input exhibits none of the recognized structural modes.
    InvalidFormat,

    /// The requested track selection path is not implemented.
    Unsupported,

    /// An invalid track number was passed in.
    ParamError,

    /// Unclassified internal or engine failure.
    Nameless,

    /// An error reported by the container engine, passed through as is.
    Engine(EngineError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MemoryExhausted => write!(f, "Memory exhausted"),
            Error::InvalidFormat => write!(f, "Not an ISOBMFF/QTFF file"),
            Error::Unsupported => write!(f, "Track selection not supported"),
            Error::ParamError => write!(f, "Invalid track number"),
            Error::Nameless => write!(f, "Unclassified importer failure"),
            Error::Engine(err) => write!(f, "Container engine error: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MemoryExhausted => Error::MemoryExhausted,
            err => Error::Engine(err),
        }
    }
}
