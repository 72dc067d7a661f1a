//! Matchmaking queue endpoints

use axum::extract::State;
use axum::Json;

use crate::matchmaking::QueueDepth;
use crate::pairing::MatchStatus;
use crate::service::protocol::{CancelResponse, FindMatchRequest, UserRequest};
use crate::service::{ApiError, AppState};
use crate::time_control::TimeControl;

/// Join or poll the queue for one time-control class.
pub async fn find_match(
    State(state): State<AppState>,
    Json(req): Json<FindMatchRequest>,
) -> Result<Json<MatchStatus>, ApiError> {
    let time_control = TimeControl::from_seconds(req.initial_time_seconds, req.increment_seconds)?;
    tracing::debug!(user = %req.user_id, %time_control, "find_match");
    let status = state.queue.enqueue(req.user_id, time_control)?;
    Ok(Json(status))
}

pub async fn cancel(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.queue.cancel(&req.user_id),
    })
}

pub async fn queue_depth(State(state): State<AppState>) -> Json<Vec<QueueDepth>> {
    Json(state.queue.depths())
}
