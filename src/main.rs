use anyhow::{bail, Context};
use log::*;
use service::{config::Config, logging::Logger};
use web::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::new();
    Logger::init_logger(&config).context("failed to initialize the logger")?;

    info!("Starting up skillshare server ({} mode)", config.runtime_env());

    if config.uses_default_jwt_secret() {
        if config.is_production() {
            bail!("JWT_SECRET must be set when running in production");
        }
        warn!("JWT_SECRET is not set; using the development signing secret");
    }
    if !config.echo_to_sender {
        info!("Chat messages will not be echoed back to their sender");
    }

    let app_state = AppState::new(config);
    web::init_server(app_state)
        .await
        .context("server terminated with an error")?;

    Ok(())
}
