use crate::extractors::RejectionType;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use domain::{jwt, user, user::User, Id};
use log::*;

pub(crate) struct AuthenticatedUser(pub User);

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub(crate) fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Verifies a login token and loads the user it names.
pub(crate) fn user_from_token(app_state: &AppState, token: &str) -> Result<User, RejectionType> {
    let unauthorized = || (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());

    let claims = jwt::verify_token(&app_state.config, token).map_err(|err| {
        debug!("Rejecting request with unverifiable token: {err}");
        unauthorized()
    })?;
    let user_id: Id = claims.sub.parse().map_err(|_| {
        warn!("Token subject is not a user id: {}", claims.sub);
        unauthorized()
    })?;

    user::find_by_id(&app_state.store, user_id).map_err(|_| {
        debug!("Token names unknown user {user_id}");
        unauthorized()
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    // Extracts the user named by the bearer token. Requests without a valid token
    // for an existing user are rejected with 401 Unauthorized.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))?;

        user_from_token(state, token).map(AuthenticatedUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_the_bearer_scheme() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
