use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use domain::user::{self as UserApi, ProfileUpdate};

use log::*;

/// GET the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Successfully retrieved the profile", body = domain::user::Profile),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn read(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(ApiResponse::new(StatusCode::OK.into(), user.profile()))
}

/// UPDATE the authenticated user's bio and skills
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = domain::user::ProfileUpdate,
    responses(
        (status = 200, description = "Successfully updated the profile", body = domain::user::Profile),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, Error> {
    debug!("UPDATE profile for user {}", user.id);

    let updated = UserApi::update_profile(&app_state.store, user.id, update)?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), updated.profile())))
}
