//! HTTP and WebSocket routing configuration.

use actix_web::web;

use crate::server::game_session::session::ws_game;
use crate::server::health::health;

/// Configure the application's HTTP/WebSocket routes.
///
/// `/ws` upgrades to a `PlayerSession` actor; `/health` reports the session phase.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").to(ws_game))
        .service(web::resource("/health").route(web::get().to(health)));
}
