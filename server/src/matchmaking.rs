//! FIFO matchmaking, one lane per time-control class.
//!
//! Enqueue-and-pair runs inside a single critical section, so an entry can
//! only ever be popped by one caller. Clients poll `enqueue` until they see
//! `MATCHED` or `IN_GAME`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chess::PlayerSide;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::time::Instant;

use crate::ids::{GameId, UserId};
use crate::pairing::{assign_colors, GameFactory, MatchStatus, Pairing};
use crate::session::SessionError;
use crate::time_control::TimeControl;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("User id must not be empty")]
    InvalidUser,
    #[error("Already searching with time control {0}")]
    AlreadyQueued(TimeControl),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub user: UserId,
    pub time_control: TimeControl,
    /// Monotonic; decides which of two same-instant entries is older.
    pub seq: u64,
    pub enqueued_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDepth {
    pub time_control: TimeControl,
    pub waiting: usize,
}

struct QueueState {
    lanes: HashMap<TimeControl, VecDeque<QueueEntry>>,
    queued: HashMap<UserId, TimeControl>,
    /// Pairings made by another caller, reported on the partner's next poll.
    notices: HashMap<UserId, (GameId, PlayerSide)>,
    next_seq: u64,
    rng: StdRng,
}

pub struct MatchmakingQueue<F> {
    state: Mutex<QueueState>,
    games: Arc<F>,
}

impl<F: GameFactory> MatchmakingQueue<F> {
    pub fn new(games: Arc<F>) -> Self {
        Self::with_rng(games, StdRng::from_entropy())
    }

    pub fn with_seed(games: Arc<F>, seed: u64) -> Self {
        Self::with_rng(games, StdRng::seed_from_u64(seed))
    }

    fn with_rng(games: Arc<F>, rng: StdRng) -> Self {
        Self {
            state: Mutex::new(QueueState {
                lanes: HashMap::new(),
                queued: HashMap::new(),
                notices: HashMap::new(),
                next_seq: 0,
                rng,
            }),
            games,
        }
    }

    /// Joins (or polls) the lane for `time_control`.
    pub fn enqueue(
        &self,
        user: UserId,
        time_control: TimeControl,
    ) -> Result<MatchStatus, QueueError> {
        if user.is_blank() {
            return Err(QueueError::InvalidUser);
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let active = self.games.active_game(&user);
        if let Some((game_id, color)) = state.notices.remove(&user) {
            if active == Some(game_id) {
                return Ok(MatchStatus::Matched {
                    game_reference_id: game_id,
                    color,
                });
            }
        }
        if let Some(game_id) = active {
            remove_entry(state, &user);
            return Ok(MatchStatus::InGame {
                game_reference_id: game_id,
            });
        }
        if let Some(&queued) = state.queued.get(&user) {
            return if queued == time_control {
                Ok(MatchStatus::Searching)
            } else {
                Err(QueueError::AlreadyQueued(queued))
            };
        }

        let lane = state.lanes.entry(time_control).or_default();
        while let Some(partner) = lane.pop_front() {
            state.queued.remove(&partner.user);
            if self.games.active_game(&partner.user).is_some() {
                tracing::debug!(user = %partner.user, "Discarding stale queue entry");
                continue;
            }

            let (white, black) =
                assign_colors(&mut state.rng, partner.user.clone(), user.clone());
            let color = if white == user {
                PlayerSide::White
            } else {
                PlayerSide::Black
            };
            let pairing = Pairing::new(white, black, time_control);

            match self.games.create_game(pairing) {
                Ok(game_id) => {
                    state
                        .notices
                        .insert(partner.user.clone(), (game_id, color.opponent()));
                    tracing::info!(
                        game = %game_id,
                        first = %partner.user,
                        second = %user,
                        %time_control,
                        waited_ms = partner.enqueued_at.elapsed().as_millis() as u64,
                        "Matched"
                    );
                    return Ok(MatchStatus::Matched {
                        game_reference_id: game_id,
                        color,
                    });
                }
                Err(SessionError::PlayerBusy(busy)) if busy == partner.user => continue,
                Err(e) => {
                    state.queued.insert(partner.user.clone(), time_control);
                    lane.push_front(partner);
                    if let Some(game_id) = self.games.active_game(&user) {
                        return Ok(MatchStatus::InGame {
                            game_reference_id: game_id,
                        });
                    }
                    return Err(e.into());
                }
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        lane.push_back(QueueEntry {
            user: user.clone(),
            time_control,
            seq,
            enqueued_at: Instant::now(),
        });
        state.queued.insert(user, time_control);
        Ok(MatchStatus::Searching)
    }

    /// Removes the caller's own unpaired entry. No-op once paired.
    pub fn cancel(&self, user: &UserId) -> bool {
        let mut state = self.state.lock();
        remove_entry(&mut state, user)
    }

    pub fn depths(&self) -> Vec<QueueDepth> {
        let state = self.state.lock();
        let mut depths: Vec<QueueDepth> = state
            .lanes
            .iter()
            .filter(|(_, lane)| !lane.is_empty())
            .map(|(tc, lane)| QueueDepth {
                time_control: *tc,
                waiting: lane.len(),
            })
            .collect();
        depths.sort_by_key(|d| (d.time_control.initial_ms, d.time_control.increment_ms));
        depths
    }

    /// Drops pairing notices whose game is no longer live.
    pub fn prune_notices(&self) {
        let mut state = self.state.lock();
        let games = &self.games;
        state
            .notices
            .retain(|user, (game_id, _)| games.active_game(user) == Some(*game_id));
    }
}

fn remove_entry(state: &mut QueueState, user: &UserId) -> bool {
    let Some(time_control) = state.queued.remove(user) else {
        return false;
    };
    if let Some(lane) = state.lanes.get_mut(&time_control) {
        lane.retain(|entry| &entry.user != user);
    }
    true
}
