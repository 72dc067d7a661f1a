use std::time::Duration;

use chess::{parse_promotion, parse_square, Game, GameError, PlayerSide};
use tokio::time::Instant;

use super::clock::Clock;
use super::commands::{JoinKind, MoveAck, MoveRequest, SessionError};
use super::events::{CompletedGame, SessionEvent};
use super::snapshot::{ClockSnapshot, GameSnapshot, MoveRecord, SeatsConnected, SessionStatus};
use crate::ids::{ConnectionId, GameId, TournamentId, UserId};
use crate::outcome::{EndMethod, GameOutcome};
use crate::pairing::Pairing;
use crate::time_control::TimeControl;

/// Timing knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long a disconnected seat may stay away from an active game.
    pub grace: Duration,
    /// How long a pending game waits for both seats.
    pub start_window: Duration,
    pub clock_update_interval: Duration,
    /// How long a completed session stays reachable before it is retired.
    pub retention: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            start_window: Duration::from_secs(60),
            clock_update_interval: Duration::from_secs(1),
            retention: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeatConnection {
    Connected,
    Disconnected { since: Instant },
}

#[derive(Debug, Clone)]
pub(crate) struct Seat {
    pub user: UserId,
    pub connection: SeatConnection,
    /// The connection currently holding this seat.
    pub bound_to: Option<ConnectionId>,
}

impl Seat {
    fn new(user: UserId, now: Instant) -> Self {
        Self {
            user,
            connection: SeatConnection::Disconnected { since: now },
            bound_to: None,
        }
    }

    fn is_connected(&self) -> bool {
        matches!(self.connection, SeatConnection::Connected)
    }
}

/// Internal mutable state, owned entirely by the session actor. No locks.
///
/// Every method takes `now` explicitly; mutations queue their events in
/// `pending_events` and the actor broadcasts them once the method returns.
pub(crate) struct SessionState {
    pub game_id: GameId,
    tournament_id: Option<TournamentId>,
    time_control: TimeControl,
    game: Game,
    white: Seat,
    black: Seat,
    white_clock: Clock,
    black_clock: Clock,
    status: SessionStatus,
    outcome: Option<GameOutcome>,
    draw_offer: Option<PlayerSide>,
    created_at: Instant,
    last_clock_update: Option<Instant>,
    settings: SessionSettings,
    pending_events: Vec<SessionEvent>,
    completion: Option<CompletedGame>,
}

impl SessionState {
    pub fn new(
        game_id: GameId,
        pairing: Pairing,
        settings: SessionSettings,
        now: Instant,
    ) -> Result<Self, SessionError> {
        let game = match pairing.start_fen.as_deref() {
            Some(fen) => Game::from_fen(fen).map_err(|e| SessionError::InvalidFen(e.to_string()))?,
            None => Game::new(),
        };
        Ok(Self {
            game_id,
            tournament_id: pairing.tournament_id,
            time_control: pairing.time_control,
            game,
            white: Seat::new(pairing.white, now),
            black: Seat::new(pairing.black, now),
            white_clock: Clock::new(pairing.time_control),
            black_clock: Clock::new(pairing.time_control),
            status: SessionStatus::Pending,
            outcome: None,
            draw_offer: None,
            created_at: now,
            last_clock_update: None,
            settings,
            pending_events: Vec::new(),
            completion: None,
        })
    }

    #[cfg(test)]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[cfg(test)]
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn side_of(&self, user: &UserId) -> Option<PlayerSide> {
        if &self.white.user == user {
            Some(PlayerSide::White)
        } else if &self.black.user == user {
            Some(PlayerSide::Black)
        } else {
            None
        }
    }

    fn seat(&self, side: PlayerSide) -> &Seat {
        match side {
            PlayerSide::White => &self.white,
            PlayerSide::Black => &self.black,
        }
    }

    fn seat_mut(&mut self, side: PlayerSide) -> &mut Seat {
        match side {
            PlayerSide::White => &mut self.white,
            PlayerSide::Black => &mut self.black,
        }
    }

    fn clock(&self, side: PlayerSide) -> &Clock {
        match side {
            PlayerSide::White => &self.white_clock,
            PlayerSide::Black => &self.black_clock,
        }
    }

    fn clock_mut(&mut self, side: PlayerSide) -> &mut Clock {
        match side {
            PlayerSide::White => &mut self.white_clock,
            PlayerSide::Black => &mut self.black_clock,
        }
    }

    fn participant(&self, user: &UserId) -> Result<PlayerSide, SessionError> {
        self.side_of(user).ok_or(SessionError::NotParticipant)
    }

    /// Applies any clock or grace deadline that has already passed. Runs
    /// ahead of every seat command as well as on the sweep.
    fn enforce_deadlines(&mut self, now: Instant) {
        if self.status != SessionStatus::Active {
            return;
        }
        let to_move = self.game.side_to_move();
        if self.clock(to_move).is_flagged(now) {
            tracing::info!(side = %to_move, "Flag fell");
            self.complete(GameOutcome::win(to_move.opponent(), EndMethod::Timeout), now);
        } else if let Some(outcome) = self.check_grace(now) {
            self.complete(outcome, now);
        }
    }

    fn require_active(&mut self, now: Instant) -> Result<(), SessionError> {
        self.enforce_deadlines(now);
        match self.status {
            SessionStatus::Active => Ok(()),
            SessionStatus::Pending => Err(SessionError::NotStarted),
            SessionStatus::Completed => Err(SessionError::GameOver),
        }
    }

    /// Binds `connection` to the user's seat.
    pub fn connect(
        &mut self,
        user: &UserId,
        connection: ConnectionId,
        now: Instant,
    ) -> Result<(PlayerSide, JoinKind), SessionError> {
        let side = self.participant(user)?;
        self.enforce_deadlines(now);
        if self.status == SessionStatus::Completed {
            return Ok((side, JoinKind::Finished));
        }

        let seat = self.seat_mut(side);
        let was_connected = seat.is_connected();
        seat.connection = SeatConnection::Connected;
        seat.bound_to = Some(connection);

        match self.status {
            SessionStatus::Pending => {
                if self.white.is_connected() && self.black.is_connected() {
                    self.start(now);
                    Ok((side, JoinKind::Started))
                } else {
                    Ok((side, JoinKind::Waiting))
                }
            }
            _ => {
                if !was_connected {
                    tracing::info!(%user, %side, "Seat reconnected");
                    self.pending_events
                        .push(SessionEvent::SeatReconnected { side });
                }
                Ok((side, JoinKind::Resumed))
            }
        }
    }

    fn start(&mut self, now: Instant) {
        self.status = SessionStatus::Active;
        let side = self.game.side_to_move();
        self.clock_mut(side).start(now);
        self.last_clock_update = Some(now);
        tracing::info!(white = %self.white.user, black = %self.black.user, "Game started");
        let snapshot = self.snapshot(now);
        self.pending_events.push(SessionEvent::GameStarted(snapshot));
    }

    /// Transport loss on `connection`. Stale connections are ignored.
    pub fn disconnect(&mut self, user: &UserId, connection: ConnectionId, now: Instant) {
        let Some(side) = self.side_of(user) else {
            return;
        };
        let status = self.status;
        let seat = self.seat_mut(side);
        if seat.bound_to != Some(connection) {
            return;
        }
        seat.bound_to = None;
        if status == SessionStatus::Completed || !seat.is_connected() {
            return;
        }
        seat.connection = SeatConnection::Disconnected { since: now };
        if status == SessionStatus::Active {
            tracing::info!(%user, %side, "Seat disconnected");
            self.pending_events.push(SessionEvent::SeatDisconnected {
                side,
                grace_ms: self.settings.grace.as_millis() as u64,
            });
        }
    }

    pub fn apply_move(
        &mut self,
        user: &UserId,
        request: &MoveRequest,
        now: Instant,
    ) -> Result<MoveAck, SessionError> {
        let side = self.participant(user)?;
        self.require_active(now)?;
        let to_move = self.game.side_to_move();

        if let Some(ply) = request.ply {
            let expected = self.game.move_count();
            if ply < expected && self.is_recorded(ply, side, request) {
                return Ok(MoveAck {
                    snapshot: self.snapshot(now),
                    duplicate: true,
                });
            }
            if ply != expected {
                return Err(SessionError::OutOfSync { expected, got: ply });
            }
        }

        if to_move != side {
            return Err(SessionError::WrongTurn);
        }

        let played = self
            .game
            .play(&request.from, &request.to, request.promotion.as_deref())
            .map(MoveRecord::from);
        let entry = match played {
            Ok(entry) => entry,
            Err(e) => return Err(self.rejected(user, e, now)),
        };

        let clock = self.clock_mut(side);
        clock.stop(now);
        clock.add_increment();
        self.draw_offer = None;

        let outcome = self.game.outcome();
        if outcome.is_none() {
            self.clock_mut(side.opponent()).start(now);
        }
        self.last_clock_update = Some(now);
        let snapshot = self.snapshot(now);
        self.pending_events.push(SessionEvent::MoveMade {
            snapshot,
            mv: entry,
        });
        if let Some(outcome) = outcome {
            self.complete(outcome.into(), now);
        }

        Ok(MoveAck {
            snapshot: self.snapshot(now),
            duplicate: false,
        })
    }

    /// Request errors leave the game untouched; anything else from the rules
    /// adapter aborts it rather than leaving it active in an unknown state.
    fn rejected(&mut self, user: &UserId, error: GameError, now: Instant) -> SessionError {
        if error.is_validation() {
            tracing::debug!(%user, %error, "Move rejected");
            return SessionError::IllegalMove(error.to_string());
        }
        tracing::error!(%error, "Rules adapter failed, aborting game");
        self.complete(GameOutcome::draw(EndMethod::Aborted), now);
        SessionError::Internal(error.to_string())
    }

    fn is_recorded(&self, ply: usize, side: PlayerSide, request: &MoveRequest) -> bool {
        let Some(entry) = self.game.history().get(ply) else {
            return false;
        };
        let (Some(from), Some(to)) = (parse_square(&request.from), parse_square(&request.to))
        else {
            return false;
        };
        let promotion = match request.promotion.as_deref() {
            Some(p) => match parse_promotion(p) {
                Some(piece) => Some(piece),
                None => return false,
            },
            None => None,
        };
        entry.side == side && entry.matches(from, to, promotion)
    }

    pub fn resign(&mut self, user: &UserId, now: Instant) -> Result<(), SessionError> {
        let side = self.participant(user)?;
        self.require_active(now)?;
        tracing::info!(%user, %side, "Resigned");
        self.complete(GameOutcome::win(side.opponent(), EndMethod::Resignation), now);
        Ok(())
    }

    /// A crossing offer (opponent already offered) is an agreement.
    pub fn offer_draw(&mut self, user: &UserId, now: Instant) -> Result<(), SessionError> {
        let side = self.participant(user)?;
        self.require_active(now)?;
        match self.draw_offer {
            Some(by) if by == side.opponent() => {
                self.complete(GameOutcome::draw(EndMethod::DrawAgreement), now);
            }
            Some(_) => {}
            None => {
                self.draw_offer = Some(side);
                self.pending_events.push(SessionEvent::DrawOffered { by: side });
            }
        }
        Ok(())
    }

    pub fn accept_draw(&mut self, user: &UserId, now: Instant) -> Result<(), SessionError> {
        let side = self.participant(user)?;
        self.require_active(now)?;
        if self.draw_offer != Some(side.opponent()) {
            return Err(SessionError::NoDrawOffer);
        }
        self.complete(GameOutcome::draw(EndMethod::DrawAgreement), now);
        Ok(())
    }

    pub fn decline_draw(&mut self, user: &UserId, now: Instant) -> Result<(), SessionError> {
        let side = self.participant(user)?;
        self.require_active(now)?;
        if self.draw_offer != Some(side.opponent()) {
            return Err(SessionError::NoDrawOffer);
        }
        self.draw_offer = None;
        self.pending_events.push(SessionEvent::DrawDeclined { by: side });
        Ok(())
    }

    /// Time-driven transitions: start window, clock expiry, grace expiry,
    /// and the periodic clock broadcast.
    pub fn tick(&mut self, now: Instant) {
        match self.status {
            SessionStatus::Pending => self.check_start_window(now),
            SessionStatus::Active => {
                self.enforce_deadlines(now);
                if self.status != SessionStatus::Active {
                    return;
                }
                let interval = self.settings.clock_update_interval;
                let due = self
                    .last_clock_update
                    .map_or(true, |at| now.saturating_duration_since(at) >= interval);
                if due {
                    self.last_clock_update = Some(now);
                    let clocks = self.clocks_at(now);
                    self.pending_events.push(SessionEvent::ClockUpdate(clocks));
                }
            }
            SessionStatus::Completed => {}
        }
    }

    fn check_start_window(&mut self, now: Instant) {
        if now.saturating_duration_since(self.created_at) < self.settings.start_window {
            return;
        }
        let outcome = match (self.white.is_connected(), self.black.is_connected()) {
            (true, false) => GameOutcome::win(PlayerSide::White, EndMethod::Abandonment),
            (false, true) => GameOutcome::win(PlayerSide::Black, EndMethod::Abandonment),
            _ => GameOutcome::draw(EndMethod::Aborted),
        };
        tracing::info!(?outcome, "Start window elapsed");
        self.complete(outcome, now);
    }

    /// The seat whose grace ran out first loses; both at once is a draw.
    fn check_grace(&self, now: Instant) -> Option<GameOutcome> {
        let expired = |seat: &Seat| match seat.connection {
            SeatConnection::Disconnected { since }
                if now.saturating_duration_since(since) >= self.settings.grace =>
            {
                Some(since)
            }
            _ => None,
        };
        match (expired(&self.white), expired(&self.black)) {
            (None, None) => None,
            (Some(_), None) => Some(GameOutcome::win(PlayerSide::Black, EndMethod::Abandonment)),
            (None, Some(_)) => Some(GameOutcome::win(PlayerSide::White, EndMethod::Abandonment)),
            (Some(w), Some(b)) if w < b => {
                Some(GameOutcome::win(PlayerSide::Black, EndMethod::Abandonment))
            }
            (Some(w), Some(b)) if b < w => {
                Some(GameOutcome::win(PlayerSide::White, EndMethod::Abandonment))
            }
            (Some(_), Some(_)) => Some(GameOutcome::draw(EndMethod::Aborted)),
        }
    }

    /// The only way into `Completed`. Later calls are ignored.
    fn complete(&mut self, outcome: GameOutcome, now: Instant) {
        if self.status == SessionStatus::Completed {
            return;
        }
        self.white_clock.stop(now);
        self.black_clock.stop(now);
        self.status = SessionStatus::Completed;
        self.outcome = Some(outcome);
        self.draw_offer = None;
        tracing::info!(result = ?outcome.result, method = ?outcome.method, "Game over");

        let snapshot = self.snapshot(now);
        self.pending_events
            .push(SessionEvent::GameOver(snapshot.clone()));
        self.completion = Some(CompletedGame {
            game_id: self.game_id,
            tournament_id: self.tournament_id,
            white: self.white.user.clone(),
            black: self.black.user.clone(),
            outcome,
            snapshot,
        });
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// The completion record, handed out exactly once.
    pub fn take_completed(&mut self) -> Option<CompletedGame> {
        self.completion.take()
    }

    pub fn clocks_at(&self, now: Instant) -> ClockSnapshot {
        let running = if self.white_clock.is_running() {
            Some(PlayerSide::White)
        } else if self.black_clock.is_running() {
            Some(PlayerSide::Black)
        } else {
            None
        };
        ClockSnapshot {
            white_time: self.white_clock.remaining_at(now),
            black_time: self.black_clock.remaining_at(now),
            running,
        }
    }

    pub fn snapshot(&self, now: Instant) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id,
            tournament_id: self.tournament_id,
            white: self.white.user.clone(),
            black: self.black.user.clone(),
            time_control: self.time_control,
            start_fen: self.game.start_fen().to_string(),
            fen: self.game.to_fen(),
            turn: self.game.side_to_move(),
            status: self.status,
            outcome: self.outcome,
            moves: self.game.history().iter().map(MoveRecord::from).collect(),
            clocks: self.clocks_at(now),
            connections: SeatsConnected {
                white: self.seat(PlayerSide::White).is_connected(),
                black: self.seat(PlayerSide::Black).is_connected(),
            },
            draw_offer: self.draw_offer,
        }
    }
}
