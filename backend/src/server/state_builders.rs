//! Builders for the handler state.

use actix_web::web;
use tracing::info;

use chama_backend::inbound::http::state::HttpState;
use chama_backend::outbound::wiring::{WiringError, build_service_ports};
use chama_backend::settings::ChamaSettings;

/// Wire adapters from `settings` and build the shared [`HttpState`].
///
/// # Errors
///
/// Propagates [`WiringError`] from adapter construction or an invalid
/// approval threshold.
pub(crate) async fn build_http_state(settings: &ChamaSettings) -> Result<HttpState, WiringError> {
    let policy = settings.approval_policy()?;
    let ports = build_service_ports(settings).await?;
    info!(
        approval_threshold = policy.threshold(),
        persistent = settings.database_url().is_some(),
        "service ports ready"
    );
    Ok(HttpState::new(&ports, policy))
}

/// Wrap the state for actix.
pub(crate) fn shared(state: HttpState) -> web::Data<HttpState> {
    web::Data::new(state)
}
