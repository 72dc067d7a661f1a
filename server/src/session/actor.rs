use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::Instrument;

use super::commands::*;
use super::events::{CompletedGame, SessionEvent};
use super::state::SessionState;

/// The main session actor loop.
/// Owns all mutable state and processes one command at a time.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    completion_tx: mpsc::UnboundedSender<CompletedGame>,
) {
    let game_id = state.game_id;
    run_session_actor_inner(state, cmd_rx, event_tx, completion_tx)
        .instrument(tracing::info_span!("session", id = %game_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    completion_tx: mpsc::UnboundedSender<CompletedGame>,
) {
    tracing::info!("Session actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        if matches!(cmd, SessionCommand::Shutdown) {
            break;
        }
        handle_command(&mut state, cmd, &event_tx);

        // Broadcast only after the state has advanced.
        for event in state.drain_events() {
            let _ = event_tx.send(event);
        }
        if let Some(done) = state.take_completed() {
            if completion_tx.send(done).is_err() {
                tracing::warn!("Completion receiver gone, result not reported");
            }
        }
    }

    tracing::info!("Session actor exited");
}

fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    let now = Instant::now();
    match cmd {
        SessionCommand::Connect {
            user,
            connection,
            reply,
        } => {
            // Subscribe before the join can emit anything.
            let events = event_tx.subscribe();
            let result = state
                .connect(&user, connection, now)
                .map(|(side, kind)| JoinAck {
                    side,
                    kind,
                    snapshot: state.snapshot(now),
                    events,
                });
            let _ = reply.send(result);
        }
        SessionCommand::Disconnect { user, connection } => {
            state.disconnect(&user, connection, now);
        }
        SessionCommand::MakeMove {
            user,
            request,
            reply,
        } => {
            let _ = reply.send(state.apply_move(&user, &request, now));
        }
        SessionCommand::Resign { user, reply } => {
            let _ = reply.send(state.resign(&user, now));
        }
        SessionCommand::OfferDraw { user, reply } => {
            let _ = reply.send(state.offer_draw(&user, now));
        }
        SessionCommand::AcceptDraw { user, reply } => {
            let _ = reply.send(state.accept_draw(&user, now));
        }
        SessionCommand::DeclineDraw { user, reply } => {
            let _ = reply.send(state.decline_draw(&user, now));
        }
        SessionCommand::Tick => state.tick(now),
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot(now));
        }
        SessionCommand::Shutdown => {}
    }
}
