use super::json_store::{JsonStore, Storable};
use super::{now_timestamp, PersistenceError};
use crate::ids::GameId;
use crate::session::GameSnapshot;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Archived form of a completed game: its final snapshot plus a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGameData {
    pub archived_at: u64,
    pub game: GameSnapshot,
}

impl Storable for FinishedGameData {
    fn id(&self) -> String {
        self.game.game_id.to_string()
    }
}

/// Archive of completed games, one JSON file each.
pub struct FinishedGameStore {
    inner: JsonStore<FinishedGameData>,
}

impl FinishedGameStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            inner: JsonStore::new(data_dir.join("finished_games")),
        }
    }

    pub fn save(&self, game: GameSnapshot) -> Result<String, PersistenceError> {
        self.inner.save(&FinishedGameData {
            archived_at: now_timestamp(),
            game,
        })
    }

    pub fn load(&self, id: GameId) -> Result<Option<FinishedGameData>, PersistenceError> {
        self.inner.load(&id.to_string())
    }
}
