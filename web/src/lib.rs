use axum::http::{header, HeaderValue, Method};
use chat::{Audience, Manager};
use domain::Store;
use log::*;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use self::error::{Error, Result};

mod controller;
mod error;
mod extractors;
mod middleware;
pub mod router;
mod socket;

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub chat_manager: Arc<Manager>,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        let audience = if app_config.echo_to_sender {
            Audience::Room
        } else {
            Audience::RoomExceptSender
        };

        Self {
            config: app_config,
            store: Arc::new(Store::new()),
            chat_manager: Arc::new(Manager::with_audience(audience)),
        }
    }
}

/// Binds the configured interface and port, then serves until the process exits.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", interface, app_state.config.port);

    let listener = TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    serve(listener, app_state).await
}

/// Serves the application on an already bound listener.
pub async fn serve(listener: TcpListener, app_state: AppState) -> std::io::Result<()> {
    let cors_layer = cors_layer(&app_state.config);
    let app = router::define_routes(app_state).layer(cors_layer);

    axum::serve(listener, app).await
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(origins)
}
