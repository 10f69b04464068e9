//! HTTP boundary of the quota-enforced record platform

pub mod handlers;

use actix_web::error::ErrorBadRequest;
use actix_web::{web, Error, HttpRequest};

use crate::record::Actor;

/// Resolve the acting member from the `User` request header.
pub fn header_handler(req: &HttpRequest) -> Result<Actor, Error> {
    let member_id = req
        .headers()
        .get("User")
        .ok_or_else(|| ErrorBadRequest("Missing User header"))?
        .to_str()
        .map_err(|_| ErrorBadRequest("Invalid User header value"))?
        .to_string();

    log_mdc::insert("user", &member_id);

    Ok(Actor::new(member_id))
}

/// Route table, shared by the server and the test harness.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/records", web::post().to(handlers::create_record))
        .route("/records/{id}", web::get().to(handlers::get_record))
        .route("/records/{id}", web::patch().to(handlers::update_record))
        .route("/records/{id}", web::delete().to(handlers::delete_record))
        .route("/records/{id}/copy", web::post().to(handlers::copy_record))
        .route(
            "/members/current/storage",
            web::get().to(handlers::member_storage),
        );
}
