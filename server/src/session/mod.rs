pub mod actor;
pub mod clock;
pub mod commands;
pub mod events;
pub mod handle;
pub mod snapshot;
pub mod state;

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::ids::{GameId, UserId};
use crate::pairing::{GameFactory, Pairing};
use actor::run_session_actor;
pub use commands::{JoinAck, JoinKind, MoveAck, MoveRequest, SessionError};
pub use events::{CompletedGame, SessionEvent};
pub use handle::SessionHandle;
pub use snapshot::{ClockSnapshot, GameSnapshot, MoveRecord, SessionStatus};
pub use state::SessionSettings;
use state::SessionState;

const INBOX_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 100;

/// Owns every live session and the user → game index.
///
/// Lock order: `active_by_user` before `sessions`. `retiring` is never held
/// together with either.
pub struct SessionManager {
    sessions: RwLock<HashMap<GameId, SessionHandle>>,
    active_by_user: Mutex<HashMap<UserId, GameId>>,
    /// Completed sessions kept for late joiners, with their completion time.
    retiring: Mutex<HashMap<GameId, Instant>>,
    completion_tx: mpsc::UnboundedSender<CompletedGame>,
    settings: SessionSettings,
}

impl SessionManager {
    /// The receiver yields one [`CompletedGame`] per finished session.
    pub fn new(settings: SessionSettings) -> (Self, mpsc::UnboundedReceiver<CompletedGame>) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let manager = Self {
            sessions: RwLock::new(HashMap::new()),
            active_by_user: Mutex::new(HashMap::new()),
            retiring: Mutex::new(HashMap::new()),
            completion_tx,
            settings,
        };
        (manager, completion_rx)
    }

    /// Seats both users in a new session and spawns its actor.
    ///
    /// The busy check and the reservation of both users happen under one
    /// lock, so a user can never be seated in two live games.
    pub fn create_session(&self, pairing: Pairing) -> Result<GameId, SessionError> {
        if pairing.white == pairing.black {
            return Err(SessionError::SelfPairing);
        }

        let mut active = self.active_by_user.lock();
        for user in [&pairing.white, &pairing.black] {
            if active.contains_key(user) {
                return Err(SessionError::PlayerBusy(user.clone()));
            }
        }

        let game_id = GameId::new();
        let (white, black) = (pairing.white.clone(), pairing.black.clone());
        let tournament_id = pairing.tournament_id;
        let time_control = pairing.time_control;
        let state = SessionState::new(game_id, pairing, self.settings, Instant::now())?;

        let (cmd_tx, cmd_rx) = mpsc::channel(INBOX_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            run_session_actor(state, cmd_rx, event_tx, completion_tx).await;
        });

        let handle = SessionHandle::new(game_id, white.clone(), black.clone(), cmd_tx);
        self.sessions.write().insert(game_id, handle);
        active.insert(white.clone(), game_id);
        active.insert(black.clone(), game_id);

        tracing::info!(
            game = %game_id,
            %white,
            %black,
            %time_control,
            tournament = ?tournament_id,
            "Session created"
        );
        Ok(game_id)
    }

    pub fn handle(&self, game_id: GameId) -> Option<SessionHandle> {
        self.sessions.read().get(&game_id).cloned()
    }

    pub fn active_game_for(&self, user: &UserId) -> Option<GameId> {
        self.active_by_user.lock().get(user).copied()
    }

    pub fn live_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Frees both players of a completed game and starts its retention window.
    pub fn release(&self, done: &CompletedGame) {
        {
            let mut active = self.active_by_user.lock();
            for user in [&done.white, &done.black] {
                if active.get(user) == Some(&done.game_id) {
                    active.remove(user);
                }
            }
        }
        self.retiring.lock().insert(done.game_id, Instant::now());
    }

    /// One pass of the periodic sweep: tick every live session, then retire
    /// completed sessions whose retention window has elapsed.
    pub async fn sweep(&self) {
        let handles: Vec<SessionHandle> = self.sessions.read().values().cloned().collect();
        let mut dead = Vec::new();
        for handle in &handles {
            if !handle.tick() {
                dead.push(handle.id());
            }
        }

        let now = Instant::now();
        let retention = self.settings.retention;
        let expired: Vec<GameId> = {
            let mut retiring = self.retiring.lock();
            let expired: Vec<GameId> = retiring
                .iter()
                .filter(|(_, at)| now.saturating_duration_since(**at) >= retention)
                .map(|(id, _)| *id)
                .collect();
            for id in &expired {
                retiring.remove(id);
            }
            expired
        };

        for id in expired.into_iter().chain(dead) {
            self.retire(id).await;
        }
    }

    async fn retire(&self, game_id: GameId) {
        let handle = self.sessions.write().remove(&game_id);
        if let Some(handle) = handle {
            tracing::debug!(game = %game_id, "Session retired");
            handle.shutdown().await;
        }
    }
}

impl GameFactory for SessionManager {
    fn active_game(&self, user: &UserId) -> Option<GameId> {
        self.active_game_for(user)
    }

    fn create_game(&self, pairing: Pairing) -> Result<GameId, SessionError> {
        self.create_session(pairing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ConnectionId;
    use crate::outcome::{EndMethod, GameOutcome};
    use crate::time_control::TimeControl;
    use chess::PlayerSide;
    use std::time::Duration;

    fn pairing(white: &str, black: &str) -> Pairing {
        Pairing::new(
            white.into(),
            black.into(),
            TimeControl::from_seconds(60, 0).unwrap(),
        )
    }

    async fn started(
        manager: &SessionManager,
        white: &str,
        black: &str,
    ) -> (SessionHandle, JoinAck, JoinAck) {
        let id = manager.create_session(pairing(white, black)).unwrap();
        let handle = manager.handle(id).unwrap();
        let w = handle
            .connect(white.into(), ConnectionId::new())
            .await
            .unwrap();
        let b = handle
            .connect(black.into(), ConnectionId::new())
            .await
            .unwrap();
        (handle, w, b)
    }

    #[tokio::test]
    async fn test_create_reserves_both_users() {
        let (manager, _rx) = SessionManager::new(SessionSettings::default());
        let id = manager.create_session(pairing("a", "b")).unwrap();
        assert_eq!(manager.active_game_for(&"a".into()), Some(id));
        assert_eq!(manager.active_game_for(&"b".into()), Some(id));

        assert_eq!(
            manager.create_session(pairing("c", "b")).unwrap_err(),
            SessionError::PlayerBusy("b".into())
        );
        assert_eq!(manager.active_game_for(&"c".into()), None);
        assert_eq!(
            manager.create_session(pairing("c", "c")).unwrap_err(),
            SessionError::SelfPairing
        );
    }

    #[tokio::test]
    async fn test_joiner_sees_its_own_game_started() {
        let (manager, _rx) = SessionManager::new(SessionSettings::default());
        let (_, mut w, mut b) = started(&manager, "a", "b").await;
        assert_eq!(w.kind, JoinKind::Waiting);
        assert_eq!(b.kind, JoinKind::Started);
        assert_eq!(b.side, PlayerSide::Black);

        assert!(matches!(b.events.recv().await.unwrap(), SessionEvent::GameStarted(_)));
        assert!(matches!(w.events.recv().await.unwrap(), SessionEvent::GameStarted(_)));
    }

    #[tokio::test]
    async fn test_move_broadcast_reaches_both_seats() {
        let (manager, _rx) = SessionManager::new(SessionSettings::default());
        let (handle, mut w, mut b) = started(&manager, "a", "b").await;
        w.events.recv().await.unwrap();
        b.events.recv().await.unwrap();

        let request = MoveRequest {
            from: "e2".into(),
            to: "e4".into(),
            promotion: None,
            ply: Some(0),
        };
        let mover = if w.side == PlayerSide::White { "a" } else { "b" };
        handle.make_move(mover.into(), request).await.unwrap();

        for rx in [&mut w.events, &mut b.events] {
            match rx.recv().await.unwrap() {
                SessionEvent::MoveMade { mv, snapshot } => {
                    assert_eq!(mv.san, "e4");
                    assert_eq!(snapshot.turn, PlayerSide::Black);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_completion_releases_players_and_reports_once() {
        let (manager, mut rx) = SessionManager::new(SessionSettings::default());
        let (handle, _, _) = started(&manager, "a", "b").await;
        handle.resign("a".into()).await.unwrap();

        let done = rx.recv().await.unwrap();
        assert_eq!(done.game_id, handle.id());
        assert_eq!(
            done.outcome,
            GameOutcome::win(PlayerSide::Black, EndMethod::Resignation)
        );
        manager.release(&done);
        assert_eq!(manager.active_game_for(&"a".into()), None);

        assert_eq!(
            handle.resign("b".into()).await.unwrap_err(),
            SessionError::GameOver
        );
        assert!(rx.try_recv().is_err());
        assert!(manager.create_session(pairing("a", "b")).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drives_timeout_and_retirement() {
        let settings = SessionSettings {
            retention: Duration::from_secs(5),
            ..SessionSettings::default()
        };
        let (manager, mut rx) = SessionManager::new(settings);
        let (handle, _, _) = started(&manager, "a", "b").await;

        tokio::time::advance(Duration::from_secs(61)).await;
        manager.sweep().await;
        let done = rx.recv().await.unwrap();
        assert_eq!(done.outcome.method, EndMethod::Timeout);
        assert_eq!(done.outcome.result.winner(), Some(PlayerSide::Black));
        manager.release(&done);

        manager.sweep().await;
        assert!(manager.handle(handle.id()).is_some());
        tokio::time::advance(Duration::from_secs(6)).await;
        manager.sweep().await;
        assert!(manager.handle(handle.id()).is_none());
        assert_eq!(manager.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_past_grace_is_abandonment() {
        let (manager, mut rx) = SessionManager::new(SessionSettings::default());
        let id = manager.create_session(pairing("a", "b")).unwrap();
        let handle = manager.handle(id).unwrap();
        let conn = ConnectionId::new();
        handle.connect("a".into(), conn).await.unwrap();
        handle
            .connect("b".into(), ConnectionId::new())
            .await
            .unwrap();

        handle.disconnect("a".into(), conn).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(!snapshot.connections.white);
        tokio::time::advance(Duration::from_secs(31)).await;
        manager.sweep().await;

        let done = rx.recv().await.unwrap();
        assert_eq!(
            done.outcome,
            GameOutcome::win(PlayerSide::Black, EndMethod::Abandonment)
        );
    }
}
