//! Unified error type.

use std::fmt;

/// The error type returned by stall's fallible operations.
///
/// The delay middleware itself never fails: malformed headers resolve to no
/// delay and cancellation is an outcome, not an error. This type surfaces
/// host failures: binding to a port, accepting a connection, or assembling a
/// [`Request`](crate::Request) from invalid parts.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Http(http::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)   => write!(f, "io: {e}"),
            Self::Http(e) => write!(f, "http: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)   => Some(e),
            Self::Http(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Self::Http(e)
    }
}
