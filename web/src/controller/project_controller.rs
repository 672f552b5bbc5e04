use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::{AppState, Error};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use domain::project::{self as ProjectApi, NewProject};

use log::*;

/// CREATE a new Project owned by the authenticated user
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = domain::project::NewProject,
    responses(
        (status = 201, description = "Successfully created a new Project", body = domain::project::Project),
        (status = 400, description = "Missing title"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(new_project): Json<NewProject>,
) -> Result<impl IntoResponse, Error> {
    debug!("CREATE new Project from: {new_project:?}");

    let project = ProjectApi::create(&app_state.store, user.id, new_project)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), project)),
    ))
}

/// GET all Projects, newest first
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Successfully retrieved all Projects", body = [domain::project::Project]),
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
    let projects = ProjectApi::list(&app_state.store);
    debug!("Found {} Projects", projects.len());

    Json(ApiResponse::new(StatusCode::OK.into(), projects))
}
