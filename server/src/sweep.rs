//! Background tasks: the periodic sweep and the completion pump.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::matchmaking::MatchmakingQueue;
use crate::persistence::FinishedGameStore;
use crate::session::{CompletedGame, SessionManager};
use crate::tournament::TournamentManager;

/// Drives every timeout in the system: clock flags, disconnect grace, start
/// windows, clock broadcasts, session retention and tournament windows.
pub async fn run_sweeper(
    interval: Duration,
    sessions: Arc<SessionManager>,
    tournaments: Arc<TournamentManager<SessionManager>>,
    queue: Arc<MatchmakingQueue<SessionManager>>,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "Sweeper started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        sessions.sweep().await;
        tournaments.sweep().await;
        queue.prune_notices();
    }
}

/// Consumes one record per completed session: frees the players, archives
/// the game and scores it in its tournament.
pub async fn run_completion_pump(
    mut completions: mpsc::UnboundedReceiver<CompletedGame>,
    sessions: Arc<SessionManager>,
    tournaments: Arc<TournamentManager<SessionManager>>,
    archive: Arc<FinishedGameStore>,
) {
    while let Some(done) = completions.recv().await {
        handle_completion(done, &sessions, &tournaments, &archive).await;
    }
    tracing::info!("Completion channel closed, pump exiting");
}

async fn handle_completion(
    done: CompletedGame,
    sessions: &SessionManager,
    tournaments: &TournamentManager<SessionManager>,
    archive: &Arc<FinishedGameStore>,
) {
    sessions.release(&done);

    let store = archive.clone();
    let snapshot = done.snapshot.clone();
    match tokio::task::spawn_blocking(move || store.save(snapshot)).await {
        Ok(Ok(_)) => tracing::debug!(game = %done.game_id, "Game archived"),
        Ok(Err(e)) => tracing::warn!(game = %done.game_id, error = %e, "Failed to archive game"),
        Err(e) => tracing::warn!(game = %done.game_id, error = %e, "Archive task failed"),
    }

    if let Some(tournament_id) = done.tournament_id {
        if let Err(e) = tournaments.report_result(tournament_id, done.game_id, done.outcome.result) {
            tracing::warn!(tournament = %tournament_id, game = %done.game_id, error = %e, "Failed to report tournament result");
        }
    }
}
