use crate::controller::ApiResponse;
use crate::{AppState, Error};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use domain::user::{self as UserApi, Registration, UserSummary};

use log::*;

/// CREATE a new User
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = domain::user::Registration,
    responses(
        (status = 201, description = "Successfully registered a new User", body = domain::user::UserSummary),
        (status = 400, description = "Missing username, email or password"),
        (status = 409, description = "Email or username already in use")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<impl IntoResponse, Error> {
    debug!("CREATE new User: {}", registration.username);

    let user = UserApi::register(&app_state.store, registration)?;
    let summary: UserSummary = user.summary();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), summary)),
    ))
}
