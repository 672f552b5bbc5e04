//! Error types for the `chat` crate.
//!
//! Follows the same pattern as `domain::error` with a root `Error` struct
//! holding an error kind and an optional source.

use std::error::Error as StdError;
use std::fmt;

use crate::connection::ConnectionId;

/// Top-level error type for the chat core.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Categories of errors the chat core reports to its callers.
///
/// Delivery failures are not represented here: fan-out is best-effort and
/// never surfaces per-member failures to the sender.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The connection was never opened or has already been closed.
    UnknownConnection(ConnectionId),
    /// The connection is already bound to an identity. Identity is immutable
    /// for the life of a connection.
    IdentityAlreadyBound(ConnectionId),
    /// A room id was blank.
    InvalidRoomId,
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::UnknownConnection(id) => write!(f, "unknown connection {id}"),
            ErrorKind::IdentityAlreadyBound(id) => {
                write!(f, "connection {id} is already bound to an identity")
            }
            ErrorKind::InvalidRoomId => write!(f, "room id must not be blank"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Error::new(error_kind)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
