//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure with
/// `domain::error::Error` as the root type holding a tree of `error_kind` enums.
/// The `source` field holds the original error, if any. The `web` layer picks an
/// HTTP status from `error_kind` and never inspects `source`.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Entity(EntityErrorKind),
    Token(TokenErrorKind),
    Internal(String),
}

/// Errors about the records held in the store.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    /// A field failed validation; carries a client-facing reason.
    Invalid(String),
    /// A uniqueness constraint was violated.
    Conflict(String),
    /// Credentials did not match any user.
    Unauthenticated,
}

/// Errors from issuing or verifying login tokens.
#[derive(Debug, PartialEq)]
pub enum TokenErrorKind {
    Expired,
    Invalid,
    Encoding,
}

impl Error {
    pub fn entity(kind: EntityErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Entity(kind),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::entity(EntityErrorKind::Invalid(reason.into()))
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::entity(EntityErrorKind::Conflict(reason.into()))
    }

    pub fn not_found() -> Self {
        Self::entity(EntityErrorKind::NotFound)
    }

    pub fn unauthenticated() -> Self {
        Self::entity(EntityErrorKind::Unauthenticated)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `jsonwebtoken` crate to the `domain` layer.
impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        let token_error_kind = match err.kind() {
            ErrorKind::ExpiredSignature => TokenErrorKind::Expired,
            ErrorKind::InvalidKeyFormat | ErrorKind::Json(_) => {
                TokenErrorKind::Encoding
            }
            _ => TokenErrorKind::Invalid,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Token(token_error_kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_signature_maps_to_expired_token() {
        let err: Error = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::ExpiredSignature,
        )
        .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Token(TokenErrorKind::Expired)
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn malformed_token_maps_to_invalid_token() {
        let err: Error =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken).into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Token(TokenErrorKind::Invalid)
        );
    }

    #[test]
    fn entity_constructors_carry_no_source() {
        let err = Error::conflict("email already registered");
        assert!(err.source.is_none());
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Entity(EntityErrorKind::Conflict(
                "email already registered".to_string()
            ))
        );
    }
}
