use axum::extract::State;
use axum::Json;

use crate::service::protocol::HealthResponse;
use crate::service::AppState;

/// Liveness plus a rough load indicator.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.live_count(),
        connections: state.connections.connection_count(),
    })
}
