//! Tournament orchestrator: lobby, opportunistic pairing of idle
//! participants, scoring, and the frozen leaderboard.

mod leaderboard;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::Instant;

use crate::ids::{GameId, TournamentId, UserId};
use crate::outcome::GameResult;
use crate::pairing::{GameFactory, MatchStatus};
use crate::persistence::{now_timestamp, TournamentRecord, TournamentStore};
use crate::session::SessionError;
use crate::time_control::TimeControl;
pub use leaderboard::Standing;
pub use state::{ReportOutcome, Tournament, TournamentConfig, TournamentStatus};

#[derive(Debug, thiserror::Error)]
pub enum TournamentError {
    #[error("Tournament not found")]
    NotFound,
    #[error("Tournament is not accepting joins")]
    NotInLobby,
    #[error("Tournament is not running")]
    NotActive,
    #[error("Already joined this tournament")]
    AlreadyJoined,
    #[error("Only the creator can do that")]
    NotCreator,
    #[error("You are not a participant of this tournament")]
    NotParticipant,
    #[error("At least two participants are needed to start")]
    NotEnoughParticipants,
    #[error("Game does not belong to this tournament")]
    UnknownGame,
    #[error("Invalid tournament configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentView {
    pub tournament_id: TournamentId,
    pub name: String,
    pub mode: String,
    pub creator: UserId,
    pub status: TournamentStatus,
    pub time_control: TimeControl,
    pub duration_minutes: u64,
    pub remaining_ms: Option<u64>,
    pub participants: usize,
    pub games_played: usize,
    pub leaderboard: Vec<Standing>,
}

/// Owns all tournaments. Each one sits behind its own mutex, which is the
/// pairing critical section for its idle pool.
pub struct TournamentManager<F> {
    tournaments: RwLock<HashMap<TournamentId, Arc<Mutex<Tournament>>>>,
    games: Arc<F>,
    store: Arc<TournamentStore>,
    rng: Mutex<StdRng>,
}

impl<F: GameFactory> TournamentManager<F> {
    pub fn new(games: Arc<F>, store: TournamentStore) -> Self {
        Self::with_rng(games, store, StdRng::from_entropy())
    }

    pub fn with_seed(games: Arc<F>, store: TournamentStore, seed: u64) -> Self {
        Self::with_rng(games, store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(games: Arc<F>, store: TournamentStore, rng: StdRng) -> Self {
        Self {
            tournaments: RwLock::new(HashMap::new()),
            games,
            store: Arc::new(store),
            rng: Mutex::new(rng),
        }
    }

    pub fn create(
        &self,
        creator: UserId,
        config: TournamentConfig,
    ) -> Result<TournamentId, TournamentError> {
        if creator.is_blank() {
            return Err(TournamentError::InvalidConfig("creator must not be empty".into()));
        }
        if config.name.trim().is_empty() {
            return Err(TournamentError::InvalidConfig("name must not be empty".into()));
        }
        if config.duration.is_zero() {
            return Err(TournamentError::InvalidConfig("duration must be positive".into()));
        }

        let id = TournamentId::new();
        let rng = StdRng::seed_from_u64(self.rng.lock().gen());
        tracing::info!(tournament = %id, %creator, name = %config.name, "Tournament created");
        let tournament = Tournament::new(id, creator, config, rng);
        self.tournaments.write().insert(id, Arc::new(Mutex::new(tournament)));
        Ok(id)
    }

    fn get(&self, id: TournamentId) -> Result<Arc<Mutex<Tournament>>, TournamentError> {
        self.tournaments
            .read()
            .get(&id)
            .cloned()
            .ok_or(TournamentError::NotFound)
    }

    pub fn join(&self, id: TournamentId, user: UserId) -> Result<TournamentStatus, TournamentError> {
        let entry = self.get(id)?;
        let mut t = entry.lock();
        t.join(user)?;
        Ok(t.status())
    }

    pub fn start(
        &self,
        id: TournamentId,
        requester: &UserId,
    ) -> Result<TournamentStatus, TournamentError> {
        let entry = self.get(id)?;
        let mut t = entry.lock();
        t.start(requester, Instant::now())?;
        tracing::info!(tournament = %id, participants = t.participant_count(), "Tournament started");
        Ok(t.status())
    }

    pub async fn find_match(
        &self,
        id: TournamentId,
        user: &UserId,
    ) -> Result<MatchStatus, TournamentError> {
        let entry = self.get(id)?;
        let (status, expired) = {
            let mut t = entry.lock();
            let expired = t.expire(Instant::now()).then(|| archive_record(&t));
            (t.find_match(user, self.games.as_ref()), expired)
        };
        if let Some(record) = expired {
            self.archive(record).await;
        }
        status
    }

    pub fn report_result(
        &self,
        id: TournamentId,
        game_id: GameId,
        result: GameResult,
    ) -> Result<ReportOutcome, TournamentError> {
        let entry = self.get(id)?;
        let mut t = entry.lock();
        let outcome = t.report_result(game_id, result)?;
        if outcome == ReportOutcome::Late {
            tracing::info!(tournament = %id, game = %game_id, "Result arrived after completion, not scored");
        }
        Ok(outcome)
    }

    pub async fn end(
        &self,
        id: TournamentId,
        requester: &UserId,
    ) -> Result<Vec<Standing>, TournamentError> {
        let entry = self.get(id)?;
        let (board, record) = {
            let mut t = entry.lock();
            let was_completed = t.status() == TournamentStatus::Completed;
            let board = t.end(requester)?;
            (board, (!was_completed).then(|| archive_record(&t)))
        };
        if let Some(record) = record {
            self.archive(record).await;
        }
        Ok(board)
    }

    /// Live view, or the archived record for a tournament from an earlier run.
    pub async fn view(&self, id: TournamentId) -> Result<TournamentView, TournamentError> {
        let entry = match self.get(id) {
            Ok(entry) => entry,
            Err(TournamentError::NotFound) => return self.archived_view(id).await,
            Err(e) => return Err(e),
        };
        let (view, expired) = {
            let mut t = entry.lock();
            let now = Instant::now();
            let expired = t.expire(now).then(|| archive_record(&t));
            let config = t.config();
            let view = TournamentView {
                tournament_id: t.id(),
                name: config.name.clone(),
                mode: config.mode.clone(),
                creator: t.creator().clone(),
                status: t.status(),
                time_control: config.time_control,
                duration_minutes: config.duration.as_secs() / 60,
                remaining_ms: t.remaining(now).map(|d| d.as_millis() as u64),
                participants: t.participant_count(),
                games_played: t.games_played(),
                leaderboard: t.leaderboard(),
            };
            (view, expired)
        };
        if let Some(record) = expired {
            self.archive(record).await;
        }
        Ok(view)
    }

    async fn archived_view(&self, id: TournamentId) -> Result<TournamentView, TournamentError> {
        let store = self.store.clone();
        let loaded = match tokio::task::spawn_blocking(move || store.load(id)).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(tournament = %id, error = %e, "Archive read task failed");
                return Err(TournamentError::NotFound);
            }
        };
        let record = match loaded {
            Ok(Some(record)) => record,
            Ok(None) => return Err(TournamentError::NotFound),
            Err(e) => {
                tracing::warn!(tournament = %id, error = %e, "Failed to read tournament archive");
                return Err(TournamentError::NotFound);
            }
        };
        Ok(TournamentView {
            tournament_id: record.tournament_id,
            name: record.name,
            mode: record.mode,
            creator: record.creator,
            status: TournamentStatus::Completed,
            time_control: record.time_control,
            duration_minutes: record.duration_minutes,
            remaining_ms: None,
            participants: record.leaderboard.len(),
            games_played: record.games.iter().filter(|g| g.result.is_some()).count(),
            leaderboard: record.leaderboard,
        })
    }

    /// Completes tournaments whose window has elapsed.
    pub async fn sweep(&self) {
        let entries: Vec<Arc<Mutex<Tournament>>> =
            self.tournaments.read().values().cloned().collect();
        let now = Instant::now();
        let expired: Vec<TournamentRecord> = entries
            .iter()
            .filter_map(|entry| {
                let mut t = entry.lock();
                t.expire(now).then(|| archive_record(&t))
            })
            .collect();
        for record in expired {
            self.archive(record).await;
        }
    }

    /// Writes the record off the async workers, after the tournament lock
    /// has been released.
    async fn archive(&self, record: TournamentRecord) {
        let store = self.store.clone();
        let id = record.tournament_id;
        match tokio::task::spawn_blocking(move || store.save(&record)).await {
            Ok(Ok(_)) => tracing::debug!(tournament = %id, "Tournament archived"),
            Ok(Err(e)) => tracing::warn!(tournament = %id, error = %e, "Failed to archive tournament"),
            Err(e) => tracing::warn!(tournament = %id, error = %e, "Archive task failed"),
        }
    }
}

fn archive_record(t: &Tournament) -> TournamentRecord {
    let config = t.config();
    TournamentRecord {
        tournament_id: t.id(),
        name: config.name.clone(),
        mode: config.mode.clone(),
        creator: t.creator().clone(),
        time_control: config.time_control,
        duration_minutes: config.duration.as_secs() / 60,
        leaderboard: t.leaderboard(),
        games: t.game_records(),
        completed_at: now_timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::testing::FakeFactory;
    use std::collections::HashSet;
    use std::time::Duration;

    fn config(minutes: u64) -> TournamentConfig {
        TournamentConfig {
            name: "Club Night".into(),
            mode: "arena".into(),
            duration: Duration::from_secs(minutes * 60),
            time_control: TimeControl::from_seconds(300, 0).unwrap(),
        }
    }

    fn manager(dir: &tempfile::TempDir) -> (Arc<FakeFactory>, TournamentManager<FakeFactory>) {
        let games = Arc::new(FakeFactory::default());
        let manager =
            TournamentManager::with_seed(games.clone(), TournamentStore::new(dir.path()), 9);
        (games, manager)
    }

    #[test]
    fn test_create_validates_config() {
        let dir = tempfile::tempdir().unwrap();
        let (_, manager) = manager(&dir);
        let mut bad = config(30);
        bad.name = "  ".into();
        assert!(matches!(
            manager.create("host".into(), bad),
            Err(TournamentError::InvalidConfig(_))
        ));
        assert!(matches!(
            manager.create("host".into(), config(0)),
            Err(TournamentError::InvalidConfig(_))
        ));
        assert!(matches!(
            manager.join(TournamentId::new(), "x".into()),
            Err(TournamentError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_archives_frozen_board() {
        let dir = tempfile::tempdir().unwrap();
        let (games, manager) = manager(&dir);
        let id = manager.create("host".into(), config(30)).unwrap();
        assert_eq!(
            manager.join(id, "guest".into()).unwrap(),
            TournamentStatus::Lobby
        );
        assert_eq!(
            manager.start(id, &"host".into()).unwrap(),
            TournamentStatus::Active
        );

        assert_eq!(
            manager.find_match(id, &"guest".into()).await.unwrap(),
            MatchStatus::Waiting
        );
        let MatchStatus::Matched {
            game_reference_id, ..
        } = manager.find_match(id, &"host".into()).await.unwrap()
        else {
            panic!("expected a pairing");
        };
        games.finish(game_reference_id);
        let (_, pairing) = games.created()[0].clone();
        manager
            .report_result(id, game_reference_id, GameResult::WhiteWon)
            .unwrap();

        let board = manager.end(id, &"host".into()).await.unwrap();
        assert_eq!(board[0].user_id, pairing.white);
        assert_eq!(board[0].points, 1.0);

        let view = manager.view(id).await.unwrap();
        assert_eq!(view.status, TournamentStatus::Completed);
        assert_eq!(view.leaderboard, board);
        assert_eq!(view.remaining_ms, None);

        let record = TournamentStore::new(dir.path()).load(id).unwrap().unwrap();
        assert_eq!(record.leaderboard, board);
        assert_eq!(record.games.len(), 1);
    }

    #[tokio::test]
    async fn test_view_falls_back_to_archive() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let (_, manager) = manager(&dir);
            let id = manager.create("host".into(), config(30)).unwrap();
            manager.join(id, "guest".into()).unwrap();
            manager.start(id, &"host".into()).unwrap();
            manager.end(id, &"host".into()).await.unwrap();
            id
        };

        let (_, restarted) = manager(&dir);
        let view = restarted.view(id).await.unwrap();
        assert_eq!(view.status, TournamentStatus::Completed);
        assert_eq!(view.participants, 2);
        assert!(matches!(
            restarted.view(TournamentId::new()).await,
            Err(TournamentError::NotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_idle_pool_never_double_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let (games, manager) = manager(&dir);
        let manager = Arc::new(manager);
        let id = manager.create("host".into(), config(30)).unwrap();
        let mut players: Vec<UserId> = vec!["host".into()];
        for i in 1..64 {
            let user = UserId::from(format!("player-{i}").as_str());
            manager.join(id, user.clone()).unwrap();
            players.push(user);
        }
        manager.start(id, &"host".into()).unwrap();

        let tasks: Vec<_> = players
            .chunks(8)
            .map(|chunk| {
                let manager = manager.clone();
                let chunk = chunk.to_vec();
                tokio::spawn(async move {
                    for user in &chunk {
                        manager.find_match(id, user).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let created = games.created();
        assert_eq!(created.len(), players.len() / 2);
        let mut seated = HashSet::new();
        for (game_id, pairing) in &created {
            assert_ne!(pairing.white, pairing.black);
            assert!(seated.insert(pairing.white.clone()));
            assert!(seated.insert(pairing.black.clone()));
            for user in [&pairing.white, &pairing.black] {
                assert_eq!(
                    manager.find_match(id, user).await.unwrap(),
                    MatchStatus::InGame {
                        game_reference_id: *game_id
                    }
                );
            }
        }
        assert_eq!(seated.len(), players.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expires_window_but_games_finish() {
        let dir = tempfile::tempdir().unwrap();
        let (games, manager) = manager(&dir);
        let id = manager.create("host".into(), config(10)).unwrap();
        manager.join(id, "guest".into()).unwrap();
        manager.start(id, &"host".into()).unwrap();
        manager.find_match(id, &"host".into()).await.unwrap();
        let MatchStatus::Matched {
            game_reference_id, ..
        } = manager.find_match(id, &"guest".into()).await.unwrap()
        else {
            panic!("expected a pairing");
        };

        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        manager.sweep().await;
        assert_eq!(manager.view(id).await.unwrap().status, TournamentStatus::Active);

        tokio::time::advance(Duration::from_secs(60)).await;
        manager.sweep().await;
        let archived = TournamentStore::new(dir.path()).load(id).unwrap();
        assert!(archived.is_some());
        let view = manager.view(id).await.unwrap();
        assert_eq!(view.status, TournamentStatus::Completed);
        assert!(view.leaderboard.iter().all(|s| s.games_played == 0));

        games.finish(game_reference_id);
        assert_eq!(
            manager
                .report_result(id, game_reference_id, GameResult::Draw)
                .unwrap(),
            ReportOutcome::Late
        );
        assert_eq!(manager.view(id).await.unwrap().leaderboard, view.leaderboard);
        assert!(matches!(
            manager.find_match(id, &"host".into()).await,
            Err(TournamentError::NotActive)
        ));
    }
}
