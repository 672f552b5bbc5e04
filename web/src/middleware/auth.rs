use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use axum::middleware::Next;

use crate::extractors::authenticated_user::AuthenticatedUser;

/// Authentication middleware that returns 401 Unauthorized for requests without
/// a valid bearer token.
pub async fn require_auth(
    authenticated_user: Result<AuthenticatedUser, (axum::http::StatusCode, String)>,
    request: Request,
    next: Next,
) -> Response {
    match authenticated_user {
        Ok(_user) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use domain::{jwt, user};
    use service::config::Config;
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "authenticated"
    }

    fn app(app_state: AppState) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .route_layer(from_fn_with_state(app_state.clone(), require_auth))
            .with_state(app_state)
    }

    #[tokio::test]
    async fn test_require_auth_returns_401_without_a_token() {
        let app_state = AppState::new(Config::from_defaults());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app(app_state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_returns_401_with_an_invalid_token() {
        let app_state = AppState::new(Config::from_defaults());

        let request = Request::builder()
            .uri("/test")
            .header("authorization", "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let response = app(app_state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_allows_authenticated_request_to_proceed() {
        let app_state = AppState::new(Config::from_defaults());
        let user = user::register(
            &app_state.store,
            user::Registration {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
            },
        )
        .unwrap();
        let jwt = jwt::issue_token(&app_state.config, &user).unwrap();

        let request = Request::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", jwt.token))
            .body(Body::empty())
            .unwrap();
        let response = app(app_state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
