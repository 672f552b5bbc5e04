use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;

use domain::error::{DomainErrorKind, EntityErrorKind, Error as DomainError, TokenErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status_and_reason(&self) -> (StatusCode, String) {
        match &self.0.error_kind {
            DomainErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                EntityErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT FOUND".to_string()),
                EntityErrorKind::Invalid(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
                EntityErrorKind::Conflict(reason) => (StatusCode::CONFLICT, reason.clone()),
                EntityErrorKind::Unauthenticated => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
            },
            DomainErrorKind::Token(token_error_kind) => match token_error_kind {
                TokenErrorKind::Expired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
                TokenErrorKind::Invalid => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
                TokenErrorKind::Encoding => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL SERVER ERROR".to_string(),
                ),
            },
            DomainErrorKind::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL SERVER ERROR".to_string(),
            ),
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, reason) = self.status_and_reason();
        if status.is_server_error() {
            error!("Request failed: {:?}", self.0);
        }
        (status, Json(json!({ "error": reason }))).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_errors_map_to_client_statuses() {
        let cases = [
            (DomainError::not_found(), StatusCode::NOT_FOUND),
            (DomainError::invalid("title is required"), StatusCode::BAD_REQUEST),
            (DomainError::conflict("email taken"), StatusCode::CONFLICT),
            (DomainError::unauthenticated(), StatusCode::UNAUTHORIZED),
        ];

        for (domain_error, expected) in cases {
            assert_eq!(Error::from(domain_error).into_response().status(), expected);
        }
    }

    #[test]
    fn token_errors_are_unauthorized() {
        let err = DomainError {
            source: None,
            error_kind: DomainErrorKind::Token(TokenErrorKind::Expired),
        };
        assert_eq!(
            Error::from(err).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_errors_hide_their_details() {
        let err = Error::from(DomainError {
            source: None,
            error_kind: DomainErrorKind::Internal("disk on fire".to_string()),
        });
        let (status, reason) = err.status_and_reason();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!reason.contains("disk"));
    }
}
