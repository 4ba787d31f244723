//! Main entry point for the backend server.
//!
//! Initializes logging and settings, wires the generation and scoring
//! gateways into the game session actor, and launches the HTTP server with
//! the game WebSocket endpoint.

use std::sync::Arc;

use actix::Actor;
use actix_web::{App, HttpServer, web};
use log::{info, warn};

use config::settings::Settings;
use gateway::comfyui::ComfyUiGateway;
use gateway::generation::{GenerationGateway, RetryingGenerator};
use gateway::scoring::{EmbeddingScorer, LexicalScorer, ScoringGateway};
use server::game_session::GameSession;

pub mod config;
mod game;
mod gateway;
mod server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env();
    info!("[Server] Settings: {:?}", settings);

    let comfyui = ComfyUiGateway::from_workflow_file(&settings.comfyui_addr, &settings.workflow_path)
        .map_err(std::io::Error::other)?;
    let generator: Arc<dyn GenerationGateway> = Arc::new(RetryingGenerator::new(comfyui));

    let scorer: Arc<dyn ScoringGateway> = match &settings.embedding_url {
        Some(url) => Arc::new(EmbeddingScorer::new(url)),
        None => {
            warn!("[Server] EMBEDDING_URL not set, using lexical similarity for scores");
            Arc::new(LexicalScorer)
        }
    };

    // Start the GameSession actor (single shared session for the process).
    let game_session = GameSession::new(generator, scorer).start();

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(game_session));

    info!("[Server] Listening on {}", settings.bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(crate::server::router::config)
    })
    .bind(settings.bind_addr)?
    .run()
    .await
}
