//! Backend entry-point: loads configuration, wires adapters and serves the
//! REST API.

mod server;

use actix_web::web;
use color_eyre::eyre::WrapErr;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use chama_backend::inbound::http::health::HealthState;
use chama_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use chama_backend::settings::ChamaSettings;
use server::{ServerConfig, build_http_state, create_server};

fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings = ChamaSettings::load().wrap_err("failed to load configuration")?;
    let env = DefaultEnv::new();
    let session = session_settings_from_env(&env, BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    info!(fingerprint = %session.fingerprint(), "session signing key loaded");

    let http_state = build_http_state(&settings)
        .await
        .wrap_err("failed to wire adapters")?;
    let config = ServerConfig::new(session, settings.bind_addr(), http_state);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(server::make_metrics());

    let health_state = web::Data::new(HealthState::new());
    info!(bind_addr = %settings.bind_addr(), "starting HTTP server");
    create_server(health_state, config)?.await?;
    Ok(())
}
