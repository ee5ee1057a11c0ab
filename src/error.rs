//! Error types for the duckle crate.
//!
//! Internally, functions return `Res<T>`, which is an `anyhow::Result`, so that context can be
//! attached freely with `anyhow::Context`. At the public boundary, errors are converted into
//! `Error`, which carries an `ErrorType` so that callers can tell a missing transaction apart from
//! a remote rejection without parsing messages.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The result type used internally, where any error can be propagated with `?`.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// The result type returned by the public functions of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an `Error` so that callers can react to it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The configuration or the home directory is missing or invalid.
    Config,
    /// The request itself was invalid, e.g. an empty category name.
    Request,
    /// A transaction id was not present in the canonical collection.
    NotFound,
    /// A category change for the same transaction is already in flight.
    Busy,
    /// The remote store could not be reached or it rejected the request.
    Remote,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type of this crate.
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    /// Wraps `source` with the given `error_type`.
    pub(crate) fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            source: source.into(),
        }
    }

    /// Creates an error of the given `error_type` from a message.
    pub(crate) fn msg<S>(error_type: ErrorType, message: S) -> Self
    where
        S: Display + Debug + Send + Sync + 'static,
    {
        Self::new(error_type, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The innermost message of the error chain. For `ErrorType::Remote` this is the reason given
    /// by the remote store, suitable for showing to a user.
    pub fn reason(&self) -> String {
        self.source.root_cause().to_string()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.source)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Converts internal results into public results by assigning an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
