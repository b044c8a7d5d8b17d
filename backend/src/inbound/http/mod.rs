//! HTTP inbound adapter exposing REST endpoints.

pub mod dto;
pub mod error;
pub mod groups;
pub mod health;
pub mod invitations;
pub mod members;
pub mod notifications;
pub mod payouts;
pub mod rounds;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` endpoint plus the extractor error handlers.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use chama_backend::inbound::http::configure_api;
///
/// let _app = App::new().configure(configure_api);
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| error::extractor_error(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| error::extractor_error(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| error::extractor_error(err)))
        .service(
            web::scope("/api/v1")
                .service(users::register_user)
                .service(users::current_user)
                .service(groups::create_group)
                .service(groups::get_group)
                .service(groups::approve_group)
                .service(groups::activate_group)
                .service(groups::payout_schedule)
                .service(members::list_members)
                .service(members::join_group)
                .service(members::review_member)
                .service(members::nominate_admin)
                .service(invitations::invite_member)
                .service(invitations::list_invitations)
                .service(invitations::accept_invitation)
                .service(invitations::reject_invitation)
                .service(rounds::record_contribution)
                .service(rounds::round_status)
                .service(rounds::authorize_round_payout)
                .service(rounds::rebuild_round_status)
                .service(payouts::create_payout_request)
                .service(payouts::list_payout_requests)
                .service(payouts::vote_payout_request)
                .service(notifications::list_notifications)
                .service(notifications::mark_notification_read),
        );
}
