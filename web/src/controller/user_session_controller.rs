use crate::controller::ApiResponse;
use crate::error::Result as WebResult;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use domain::jwt;
use domain::user::{self as UserApi, Credentials, UserSummary};
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct UserSession {
    token: String,
    user: UserSummary,
}

/// Logs the user in and returns a signed login token.
///
/// Pass the token back on every protected API call, e.g.:
/// curl --header "Authorization: Bearer <token>" --request GET http://localhost:5000/api/profile
///
/// The same token authenticates a chat connection: ws://localhost:5000/ws?token=<token>
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = domain::user::Credentials,
    responses(
        (status = 200, description = "Logs in and returns a login token", body = UserSession),
        (status = 401, description = "Invalid credentials"),
        (status = 405, description = "Method not allowed")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> WebResult<impl IntoResponse> {
    let user = UserApi::authenticate(&app_state.store, creds).map_err(|err| {
        warn!("Authentication failed: {err}");
        err
    })?;
    let jwt = jwt::issue_token(&app_state.config, &user)?;

    debug!("Issued login token for user {}", user.id);

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        UserSession {
            token: jwt.token,
            user: user.summary(),
        },
    )))
}
