use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chess::PlayerSide;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::time::Instant;

use super::leaderboard::{rank, Standing};
use super::TournamentError;
use crate::ids::{GameId, TournamentId, UserId};
use crate::outcome::GameResult;
use crate::pairing::{assign_colors, GameFactory, MatchStatus, Pairing};
use crate::persistence::TournamentGameRecord;
use crate::session::SessionError;
use crate::time_control::TimeControl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentConfig {
    pub name: String,
    /// Free-form label from the client (e.g. "blitz", "arena").
    pub mode: String,
    pub duration: Duration,
    pub time_control: TimeControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    Lobby,
    Active,
    Completed,
}

#[derive(Debug, Clone)]
pub(crate) struct Participant {
    pub user: UserId,
    pub joined_seq: u64,
    pub half_points: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub current_game: Option<GameId>,
}

impl Participant {
    pub fn new(user: UserId, joined_seq: u64) -> Self {
        Self {
            user,
            joined_seq,
            half_points: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            current_game: None,
        }
    }

    fn record(&mut self, result: GameResult, side: PlayerSide) {
        self.half_points += result.half_points_for(side);
        match result.winner() {
            Some(winner) if winner == side => self.wins += 1,
            Some(_) => self.losses += 1,
            None => self.draws += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TournamentGame {
    pub white: UserId,
    pub black: UserId,
    pub result: Option<GameResult>,
    pub scored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Recorded,
    /// Already reported; nothing changed.
    Duplicate,
    /// Reported after completion: players freed, score untouched.
    Late,
}

/// One tournament's state. Pure; the manager provides locking.
pub struct Tournament {
    id: TournamentId,
    creator: UserId,
    config: TournamentConfig,
    status: TournamentStatus,
    participants: Vec<Participant>,
    waiting: VecDeque<UserId>,
    games: HashMap<GameId, TournamentGame>,
    ends_at: Option<Instant>,
    frozen: Option<Vec<Standing>>,
    rng: StdRng,
}

impl Tournament {
    /// Created in `Lobby` with the creator already joined.
    pub fn new(
        id: TournamentId,
        creator: UserId,
        config: TournamentConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            participants: vec![Participant::new(creator.clone(), 0)],
            creator,
            config,
            status: TournamentStatus::Lobby,
            waiting: VecDeque::new(),
            games: HashMap::new(),
            ends_at: None,
            frozen: None,
            rng,
        }
    }

    pub fn id(&self) -> TournamentId {
        self.id
    }

    pub fn status(&self) -> TournamentStatus {
        self.status
    }

    pub fn creator(&self) -> &UserId {
        &self.creator
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn games_played(&self) -> usize {
        self.games.values().filter(|g| g.result.is_some()).count()
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.status {
            TournamentStatus::Active => self
                .ends_at
                .map(|end| end.saturating_duration_since(now)),
            _ => None,
        }
    }

    fn participant_mut(&mut self, user: &UserId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.user == user)
    }

    pub fn join(&mut self, user: UserId) -> Result<(), TournamentError> {
        if self.status != TournamentStatus::Lobby {
            return Err(TournamentError::NotInLobby);
        }
        if self.participants.iter().any(|p| p.user == user) {
            return Err(TournamentError::AlreadyJoined);
        }
        let seq = self.participants.len() as u64;
        self.participants.push(Participant::new(user, seq));
        Ok(())
    }

    pub fn start(&mut self, requester: &UserId, now: Instant) -> Result<(), TournamentError> {
        if requester != &self.creator {
            return Err(TournamentError::NotCreator);
        }
        if self.status != TournamentStatus::Lobby {
            return Err(TournamentError::NotInLobby);
        }
        if self.participants.len() < 2 {
            return Err(TournamentError::NotEnoughParticipants);
        }
        self.status = TournamentStatus::Active;
        self.ends_at = Some(now + self.config.duration);
        Ok(())
    }

    /// Idempotent poll: `IN_GAME` while seated, otherwise pair with the
    /// longest-idle participant or wait.
    pub fn find_match<F: GameFactory + ?Sized>(
        &mut self,
        user: &UserId,
        games: &F,
    ) -> Result<MatchStatus, TournamentError> {
        let participant = self
            .participants
            .iter()
            .find(|p| &p.user == user)
            .ok_or(TournamentError::NotParticipant)?;
        if let Some(game_id) = participant.current_game {
            return Ok(MatchStatus::InGame {
                game_reference_id: game_id,
            });
        }
        if self.status != TournamentStatus::Active {
            return Err(TournamentError::NotActive);
        }
        if games.active_game(user).is_some() {
            return Err(SessionError::PlayerBusy(user.clone()).into());
        }

        while let Some(index) = self.waiting.iter().position(|u| u != user) {
            let Some(partner) = self.waiting.remove(index) else {
                break;
            };
            let idle = self
                .participants
                .iter()
                .any(|p| p.user == partner && p.current_game.is_none());
            if !idle || games.active_game(&partner).is_some() {
                tracing::debug!(user = %partner, "Dropping busy participant from waiting pool");
                continue;
            }

            let (white, black) = assign_colors(&mut self.rng, partner.clone(), user.clone());
            let color = if &white == user {
                PlayerSide::White
            } else {
                PlayerSide::Black
            };
            let pairing = Pairing::new(white.clone(), black.clone(), self.config.time_control)
                .in_tournament(self.id);

            match games.create_game(pairing) {
                Ok(game_id) => {
                    self.waiting.retain(|u| u != user);
                    for seated in [&white, &black] {
                        if let Some(p) = self.participant_mut(seated) {
                            p.current_game = Some(game_id);
                        }
                    }
                    self.games.insert(
                        game_id,
                        TournamentGame {
                            white,
                            black,
                            result: None,
                            scored: false,
                        },
                    );
                    tracing::info!(tournament = %self.id, game = %game_id, first = %partner, second = %user, "Tournament pairing");
                    return Ok(MatchStatus::Matched {
                        game_reference_id: game_id,
                        color,
                    });
                }
                Err(SessionError::PlayerBusy(busy)) if busy == partner => continue,
                Err(e) => {
                    self.waiting.insert(index, partner);
                    return Err(e.into());
                }
            }
        }

        if !self.waiting.contains(user) {
            self.waiting.push_back(user.clone());
        }
        Ok(MatchStatus::Waiting)
    }

    pub fn report_result(
        &mut self,
        game_id: GameId,
        result: GameResult,
    ) -> Result<ReportOutcome, TournamentError> {
        let game = self
            .games
            .get_mut(&game_id)
            .ok_or(TournamentError::UnknownGame)?;
        if game.result.is_some() {
            return Ok(ReportOutcome::Duplicate);
        }
        game.result = Some(result);
        let scored = self.status != TournamentStatus::Completed;
        game.scored = scored;
        let seats = [
            (game.white.clone(), PlayerSide::White),
            (game.black.clone(), PlayerSide::Black),
        ];

        for (user, side) in seats {
            if let Some(p) = self.participant_mut(&user) {
                if p.current_game == Some(game_id) {
                    p.current_game = None;
                }
                if scored {
                    p.record(result, side);
                }
            }
        }
        Ok(if scored {
            ReportOutcome::Recorded
        } else {
            ReportOutcome::Late
        })
    }

    /// Completes the tournament and freezes the leaderboard. Repeat calls
    /// return the frozen board.
    pub fn end(&mut self, requester: &UserId) -> Result<Vec<Standing>, TournamentError> {
        if requester != &self.creator {
            return Err(TournamentError::NotCreator);
        }
        self.complete();
        Ok(self.leaderboard())
    }

    /// Completes an active tournament whose window has elapsed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match (self.status, self.ends_at) {
            (TournamentStatus::Active, Some(end)) if now >= end => {
                self.complete();
                true
            }
            _ => false,
        }
    }

    fn complete(&mut self) {
        if self.status == TournamentStatus::Completed {
            return;
        }
        self.status = TournamentStatus::Completed;
        self.waiting.clear();
        self.frozen = Some(rank(&self.participants));
        tracing::info!(tournament = %self.id, games = self.games_played(), "Tournament completed");
    }

    pub fn game_records(&self) -> Vec<TournamentGameRecord> {
        let mut records: Vec<TournamentGameRecord> = self
            .games
            .iter()
            .map(|(id, g)| TournamentGameRecord {
                game_id: *id,
                white: g.white.clone(),
                black: g.black.clone(),
                result: g.result,
                scored: g.scored,
            })
            .collect();
        records.sort_by_key(|r| r.game_id);
        records
    }

    pub fn leaderboard(&self) -> Vec<Standing> {
        match &self.frozen {
            Some(board) => board.clone(),
            None => rank(&self.participants),
        }
    }

    #[cfg(test)]
    fn is_seated(&self, user: &UserId) -> bool {
        self.participants
            .iter()
            .any(|p| &p.user == user && p.current_game.is_some())
    }
}
