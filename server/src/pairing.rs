//! The seam between pairing (queue, tournaments) and session creation.

use chess::PlayerSide;
use rand::Rng;
use serde::Serialize;

use crate::ids::{GameId, TournamentId, UserId};
use crate::session::SessionError;
use crate::time_control::TimeControl;

/// Two users about to be seated in a new game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub white: UserId,
    pub black: UserId,
    pub time_control: TimeControl,
    pub tournament_id: Option<TournamentId>,
    /// Legend or opening offset; standard start position when `None`.
    pub start_fen: Option<String>,
}

impl Pairing {
    pub fn new(white: UserId, black: UserId, time_control: TimeControl) -> Self {
        Self {
            white,
            black,
            time_control,
            tournament_id: None,
            start_fen: None,
        }
    }

    pub fn in_tournament(mut self, tournament_id: TournamentId) -> Self {
        self.tournament_id = Some(tournament_id);
        self
    }

    #[cfg(test)]
    pub fn side_of(&self, user: &UserId) -> Option<PlayerSide> {
        if &self.white == user {
            Some(PlayerSide::White)
        } else if &self.black == user {
            Some(PlayerSide::Black)
        } else {
            None
        }
    }
}

/// Creates game sessions and answers which game a user is seated in.
///
/// `create_game` must check and reserve both users in one critical section:
/// it fails with [`SessionError::PlayerBusy`] rather than seat anyone twice.
pub trait GameFactory: Send + Sync {
    fn active_game(&self, user: &UserId) -> Option<GameId>;

    fn create_game(&self, pairing: Pairing) -> Result<GameId, SessionError>;
}

/// Answer to a find-match poll, from the queue or a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Searching,
    #[serde(rename_all = "camelCase")]
    Matched {
        game_reference_id: GameId,
        color: PlayerSide,
    },
    #[serde(rename_all = "camelCase")]
    InGame { game_reference_id: GameId },
    Waiting,
}

/// The earlier entry gets a random color, the later one the other.
/// Returns `(white, black)`.
pub fn assign_colors<R: Rng + ?Sized>(
    rng: &mut R,
    earlier: UserId,
    later: UserId,
) -> (UserId, UserId) {
    if rng.gen_bool(0.5) {
        (earlier, later)
    } else {
        (later, earlier)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    /// In-memory factory that records every pairing it seats.
    #[derive(Default)]
    pub struct FakeFactory {
        pub active: Mutex<HashMap<UserId, GameId>>,
        pub created: Mutex<Vec<(GameId, Pairing)>>,
    }

    impl FakeFactory {
        pub fn finish(&self, game: GameId) {
            self.active.lock().retain(|_, g| *g != game);
        }

        pub fn seat(&self, user: &str, game: GameId) {
            self.active.lock().insert(UserId::from(user), game);
        }

        pub fn created(&self) -> Vec<(GameId, Pairing)> {
            self.created.lock().clone()
        }
    }

    impl GameFactory for FakeFactory {
        fn active_game(&self, user: &UserId) -> Option<GameId> {
            self.active.lock().get(user).copied()
        }

        fn create_game(&self, pairing: Pairing) -> Result<GameId, SessionError> {
            let mut active = self.active.lock();
            for user in [&pairing.white, &pairing.black] {
                if active.contains_key(user) {
                    return Err(SessionError::PlayerBusy(user.clone()));
                }
            }
            let id = GameId::new();
            active.insert(pairing.white.clone(), id);
            active.insert(pairing.black.clone(), id);
            self.created.lock().push((id, pairing));
            Ok(id)
        }
    }
}
