//! HTTP and WebSocket surface
//!
//! - protocol: wire types for the socket and the JSON endpoints
//! - converters: session events → socket messages
//! - error: module errors → HTTP status and `{error, code}` body
//! - endpoints: axum handlers grouped by domain

mod converters;
mod endpoints;
mod error;
mod protocol;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::connection::ConnectionRegistry;
use crate::matchmaking::MatchmakingQueue;
use crate::persistence::FinishedGameStore;
use crate::session::SessionManager;
use crate::tournament::TournamentManager;
pub use error::ApiError;

/// Shared handles to the stateful core; cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub connections: Arc<ConnectionRegistry>,
    pub queue: Arc<MatchmakingQueue<SessionManager>>,
    pub tournaments: Arc<TournamentManager<SessionManager>>,
    pub archive: Arc<FinishedGameStore>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(endpoints::health::health_check))
        .route("/ws", get(endpoints::socket::ws_upgrade))
        .route("/api/matchmaking", get(endpoints::matchmaking::queue_depth))
        .route(
            "/api/matchmaking/find",
            post(endpoints::matchmaking::find_match),
        )
        .route(
            "/api/matchmaking/cancel",
            post(endpoints::matchmaking::cancel),
        )
        .route("/api/tournaments", post(endpoints::tournament::create))
        .route("/api/tournaments/{id}", get(endpoints::tournament::view))
        .route(
            "/api/tournaments/{id}/join",
            post(endpoints::tournament::join),
        )
        .route(
            "/api/tournaments/{id}/start",
            post(endpoints::tournament::start),
        )
        .route("/api/tournaments/{id}/end", post(endpoints::tournament::end))
        .route(
            "/api/tournaments/{id}/find-match",
            post(endpoints::tournament::find_match),
        )
        .route("/api/games/{id}", get(endpoints::games::get_game))
        .layer(cors)
        .with_state(state)
}
