use super::json_store::{JsonStore, Storable};
use super::PersistenceError;
use crate::ids::{GameId, TournamentId, UserId};
use crate::outcome::GameResult;
use crate::time_control::TimeControl;
use crate::tournament::Standing;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentGameRecord {
    pub game_id: GameId,
    pub white: UserId,
    pub black: UserId,
    pub result: Option<GameResult>,
    /// False for results that arrived after the tournament completed.
    pub scored: bool,
}

/// A completed tournament with its frozen leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentRecord {
    pub tournament_id: TournamentId,
    pub name: String,
    pub mode: String,
    pub creator: UserId,
    pub time_control: TimeControl,
    pub duration_minutes: u64,
    pub leaderboard: Vec<Standing>,
    pub games: Vec<TournamentGameRecord>,
    pub completed_at: u64,
}

impl Storable for TournamentRecord {
    fn id(&self) -> String {
        self.tournament_id.to_string()
    }
}

pub struct TournamentStore {
    inner: JsonStore<TournamentRecord>,
}

impl TournamentStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            inner: JsonStore::new(data_dir.join("tournaments")),
        }
    }

    pub fn save(&self, record: &TournamentRecord) -> Result<String, PersistenceError> {
        self.inner.save(record)
    }

    pub fn load(&self, id: TournamentId) -> Result<Option<TournamentRecord>, PersistenceError> {
        self.inner.load(&id.to_string())
    }
}
