//! One-shot contribution reminder sweep, intended to run from a scheduler.

use color_eyre::eyre::WrapErr;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use chama_backend::domain::ContributionReminderService;
use chama_backend::outbound::wiring::build_service_ports;
use chama_backend::settings::ChamaSettings;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ChamaSettings::load().wrap_err("failed to load configuration")?;
    let ports = build_service_ports(&settings)
        .await
        .wrap_err("failed to wire adapters")?;
    let service = ContributionReminderService::new(&ports, settings.reminder_window_days());

    let summary = service
        .send_reminders()
        .await
        .wrap_err("reminder sweep failed")?;
    info!(
        groups = summary.groups,
        reminders = summary.reminders,
        window_days = settings.reminder_window_days(),
        "reminder sweep complete"
    );
    Ok(())
}
