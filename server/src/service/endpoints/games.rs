//! Game lookup: the live session while it is in memory, the archive after.

use axum::extract::{Path, State};
use axum::Json;

use crate::ids::GameId;
use crate::service::protocol::{GameResponse, GameSource};
use crate::service::{ApiError, AppState};
use crate::session::SessionError;

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<GameResponse>, ApiError> {
    if let Some(handle) = state.sessions.handle(id) {
        match handle.snapshot().await {
            Ok(game) => {
                return Ok(Json(GameResponse {
                    source: GameSource::Live,
                    game,
                }))
            }
            // Retired between lookup and query; fall through to the archive.
            Err(SessionError::Internal(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let store = state.archive.clone();
    let archived = tokio::task::spawn_blocking(move || store.load(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match archived {
        Some(data) => Ok(Json(GameResponse {
            source: GameSource::Archive,
            game: data.game,
        })),
        None => Err(SessionError::NotFound.into()),
    }
}
