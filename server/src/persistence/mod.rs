//! JSON archive for completed games and tournaments.

mod finished_game_store;
mod json_store;
mod tournament_store;

pub use finished_game_store::{FinishedGameData, FinishedGameStore};
pub use tournament_store::{TournamentGameRecord, TournamentRecord, TournamentStore};

use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
