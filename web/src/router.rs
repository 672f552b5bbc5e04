use crate::{controller::health_check_controller, middleware::auth::require_auth, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};

use crate::controller::{
    profile_controller, project_controller, skill_controller, user_controller,
    user_session_controller,
};
use crate::socket::handler as socket_handler;

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Skillshare API"
        ),
        paths(
            health_check_controller::health_check,
            user_controller::create,
            user_session_controller::login,
            profile_controller::read,
            profile_controller::update,
            project_controller::create,
            project_controller::index,
            skill_controller::index,
        ),
        components(
            schemas(
                domain::user::Credentials,
                domain::user::Profile,
                domain::user::ProfileUpdate,
                domain::user::Registration,
                domain::user::UserSummary,
                domain::project::NewProject,
                domain::project::Project,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "skillshare", description = "Skill sharing profiles, projects and chat")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our bearer token authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes(app_state.clone()))
        .merge(profile_routes(app_state.clone()))
        .merge(project_routes(app_state.clone()))
        .merge(skill_routes(app_state.clone()))
        .merge(socket_routes(app_state))
        .route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn auth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(user_controller::create))
        .route("/api/auth/login", post(user_session_controller::login))
        .with_state(app_state)
}

fn profile_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/profile",
            get(profile_controller::read).put(profile_controller::update),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn project_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/projects",
            get(project_controller::index).post(project_controller::create),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn skill_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/skills", get(skill_controller::index))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn socket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(socket_handler::ws_handler))
        .with_state(app_state)
}
