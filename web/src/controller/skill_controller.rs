use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use domain::skill as SkillApi;

/// GET every distinct skill listed on any profile
#[utoipa::path(
    get,
    path = "/api/skills",
    responses(
        (status = 200, description = "Successfully retrieved all skills", body = [String]),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn index(
    AuthenticatedUser(_user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    Json(ApiResponse::new(
        StatusCode::OK.into(),
        SkillApi::all(&app_state.store),
    ))
}
