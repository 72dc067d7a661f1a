//! Persistent bidirectional channel (`GET /ws`).
//!
//! One task per connection runs a select loop over inbound frames and an
//! outbound queue. Each successful `join_game` spawns a forwarder that pulls
//! the session's broadcast stream, filters it for the joined seat, and feeds
//! the outbound queue. A new join replaces the previous forwarder.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chess::PlayerSide;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::ids::{ConnectionId, GameId, UserId};
use crate::service::converters::{
    convert_session_event, convert_snapshot_to_game_over, convert_snapshot_to_started,
};
use crate::service::protocol::{ClientMessage, ServerMessage};
use crate::service::AppState;
use crate::session::{JoinKind, MoveRequest, SessionError, SessionEvent, SessionHandle};

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// Per-connection state owned by the socket task.
struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
    forwarder: Option<JoinHandle<()>>,
}

impl Connection {
    fn send(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }

    fn replace_forwarder(&mut self, forwarder: JoinHandle<()>) {
        if let Some(previous) = self.forwarder.replace(forwarder) {
            previous.abort();
        }
    }
}

async fn handle_socket(state: AppState, mut socket: WebSocket) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut conn = Connection {
        id: state.connections.register(),
        tx,
        forwarder: None,
    };

    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to encode server message"),
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => handle_message(&state, &mut conn, msg).await,
                            Err(e) => conn.send(ServerMessage::error(format!("Invalid message: {e}"))),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    if let Some(forwarder) = conn.forwarder.take() {
        forwarder.abort();
    }
    state.connections.release(conn.id).await;
}

async fn handle_message(state: &AppState, conn: &mut Connection, msg: ClientMessage) {
    match msg {
        ClientMessage::JoinGame {
            session_id,
            user_id,
        } => join_game(state, conn, session_id, user_id).await,
        ClientMessage::MakeMove {
            session_id,
            from,
            to,
            promotion,
            ply,
        } => {
            let request = MoveRequest {
                from,
                to,
                promotion,
                ply,
            };
            let result = match state.connections.bound_session(conn.id, session_id) {
                Ok((user, handle)) => handle.make_move(user, request).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(ack) if ack.duplicate => {
                    // The retried move was already applied; resync this seat.
                    if let Some(side) = state
                        .connections
                        .binding(conn.id)
                        .and_then(|b| side_in(&ack.snapshot, &b.user))
                    {
                        conn.send(convert_snapshot_to_started(&ack.snapshot, side));
                    }
                }
                Ok(_) => {}
                Err(e) => reject(conn, session_id, e),
            }
        }
        ClientMessage::Resign { session_id } => {
            act(state, conn, session_id, |handle, user| async move {
                handle.resign(user).await
            })
            .await
        }
        ClientMessage::OfferDraw { session_id } => {
            act(state, conn, session_id, |handle, user| async move {
                handle.offer_draw(user).await
            })
            .await
        }
        ClientMessage::AcceptDraw { session_id } => {
            act(state, conn, session_id, |handle, user| async move {
                handle.accept_draw(user).await
            })
            .await
        }
        ClientMessage::DeclineDraw { session_id } => {
            act(state, conn, session_id, |handle, user| async move {
                handle.decline_draw(user).await
            })
            .await
        }
    }
}

async fn join_game(state: &AppState, conn: &mut Connection, game_id: GameId, user: UserId) {
    let ack = match state.connections.join_game(conn.id, game_id, user.clone()).await {
        Ok(ack) => ack,
        Err(e) => {
            tracing::debug!(connection = %conn.id, game = %game_id, %user, error = %e, "Join rejected");
            conn.send(error_message(&e));
            return;
        }
    };

    match ack.kind {
        JoinKind::Waiting => conn.send(ServerMessage::WaitingForOpponent {
            game_id,
            your_color: ack.side,
        }),
        // game_started is already on the subscribed stream.
        JoinKind::Started => {}
        JoinKind::Resumed => conn.send(convert_snapshot_to_started(&ack.snapshot, ack.side)),
        JoinKind::Finished => {
            if let Some(msg) = convert_snapshot_to_game_over(&ack.snapshot) {
                conn.send(msg);
            }
            return;
        }
    }

    if let Some(handle) = state.sessions.handle(game_id) {
        let forwarder = tokio::spawn(forward_events(
            ack.events,
            handle,
            ack.side,
            conn.tx.clone(),
        ));
        conn.replace_forwarder(forwarder);
    }
}

/// Pumps one session's events to one seat until the session or the
/// connection goes away.
async fn forward_events(
    events: broadcast::Receiver<SessionEvent>,
    handle: SessionHandle,
    side: PlayerSide,
    tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let game_id = handle.id();
    let mut events = BroadcastStream::new(events);
    while let Some(item) = events.next().await {
        let msg = match item {
            Ok(event) => convert_session_event(&event, game_id, side),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(game = %game_id, skipped, "Forwarder lagged, resyncing");
                match handle.snapshot().await {
                    Ok(snap) => Some(convert_snapshot_to_started(&snap, side)),
                    Err(_) => break,
                }
            }
        };
        if let Some(msg) = msg {
            if tx.send(msg).is_err() {
                break;
            }
        }
    }
}

/// Runs a seat action on the session this connection joined.
async fn act<F, Fut>(state: &AppState, conn: &Connection, game_id: GameId, action: F)
where
    F: FnOnce(SessionHandle, UserId) -> Fut,
    Fut: std::future::Future<Output = Result<(), SessionError>>,
{
    let result = match state.connections.bound_session(conn.id, game_id) {
        Ok((user, handle)) => action(handle, user).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        reject(conn, game_id, e);
    }
}

/// Validation failures go back as `move_error` so the client can re-render
/// the previous position; everything else is a plain `error`.
fn reject(conn: &Connection, game_id: GameId, e: SessionError) {
    tracing::debug!(connection = %conn.id, game = %game_id, error = %e, "Request rejected");
    let msg = if e.is_validation() || matches!(e, SessionError::GameOver | SessionError::NotStarted) {
        ServerMessage::MoveError {
            game_id,
            message: e.to_string(),
        }
    } else {
        error_message(&e)
    };
    conn.send(msg);
}

fn error_message(e: &SessionError) -> ServerMessage {
    match e {
        SessionError::NotParticipant | SessionError::NotJoined => {
            ServerMessage::join_flow(e.to_string())
        }
        _ => ServerMessage::error(e.to_string()),
    }
}

fn side_in(snap: &crate::session::GameSnapshot, user: &UserId) -> Option<PlayerSide> {
    PlayerSide::BOTH.into_iter().find(|side| snap.user(*side) == user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::Pairing;
    use crate::service::test_support::app_state;
    use crate::time_control::TimeControl;

    struct TestConn {
        conn: Connection,
        rx: mpsc::UnboundedReceiver<ServerMessage>,
    }

    fn open(state: &AppState) -> TestConn {
        let (tx, rx) = mpsc::unbounded_channel();
        TestConn {
            conn: Connection {
                id: state.connections.register(),
                tx,
                forwarder: None,
            },
            rx,
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("message in time")
            .expect("channel open")
    }

    fn game(state: &AppState) -> GameId {
        state
            .sessions
            .create_session(Pairing::new(
                "alice".into(),
                "bob".into(),
                TimeControl::from_seconds(300, 0).unwrap(),
            ))
            .unwrap()
    }

    fn join(game_id: GameId, user: &str) -> ClientMessage {
        ClientMessage::JoinGame {
            session_id: game_id,
            user_id: user.into(),
        }
    }

    #[tokio::test]
    async fn test_join_start_and_move_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());
        let game_id = game(&state);
        let mut white = open(&state);
        let mut black = open(&state);

        handle_message(&state, &mut white.conn, join(game_id, "alice")).await;
        assert_eq!(
            next(&mut white.rx).await,
            ServerMessage::WaitingForOpponent {
                game_id,
                your_color: PlayerSide::White
            }
        );

        handle_message(&state, &mut black.conn, join(game_id, "bob")).await;
        for (seat, color) in [(&mut white, PlayerSide::White), (&mut black, PlayerSide::Black)] {
            match next(&mut seat.rx).await {
                ServerMessage::GameStarted { your_color, .. } => assert_eq!(your_color, color),
                other => panic!("expected game_started, got {other:?}"),
            }
        }

        handle_message(
            &state,
            &mut white.conn,
            ClientMessage::MakeMove {
                session_id: game_id,
                from: "e2".into(),
                to: "e4".into(),
                promotion: None,
                ply: Some(0),
            },
        )
        .await;
        for seat in [&mut white, &mut black] {
            match next(&mut seat.rx).await {
                ServerMessage::MoveMade { san, turn, .. } => {
                    assert_eq!(san, "e4");
                    assert_eq!(turn, PlayerSide::Black);
                }
                other => panic!("expected move_made, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_outsider_is_sent_to_join_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());
        let game_id = game(&state);
        let mut outsider = open(&state);

        handle_message(&state, &mut outsider.conn, join(game_id, "mallory")).await;
        assert_eq!(
            next(&mut outsider.rx).await,
            ServerMessage::join_flow("You are not part of this game")
        );

        handle_message(
            &state,
            &mut outsider.conn,
            ClientMessage::Resign {
                session_id: game_id,
            },
        )
        .await;
        assert!(matches!(
            next(&mut outsider.rx).await,
            ServerMessage::Error { action: Some(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_illegal_move_bounces_to_sender_only() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());
        let game_id = game(&state);
        let mut white = open(&state);
        let mut black = open(&state);
        handle_message(&state, &mut white.conn, join(game_id, "alice")).await;
        handle_message(&state, &mut black.conn, join(game_id, "bob")).await;
        next(&mut white.rx).await;
        next(&mut white.rx).await;
        next(&mut black.rx).await;

        handle_message(
            &state,
            &mut white.conn,
            ClientMessage::MakeMove {
                session_id: game_id,
                from: "e2".into(),
                to: "e5".into(),
                promotion: None,
                ply: None,
            },
        )
        .await;
        assert!(matches!(
            next(&mut white.rx).await,
            ServerMessage::MoveError { .. }
        ));
        assert!(black.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_notifies_opponent() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());
        let game_id = game(&state);
        let mut white = open(&state);
        let mut black = open(&state);
        handle_message(&state, &mut white.conn, join(game_id, "alice")).await;
        handle_message(&state, &mut black.conn, join(game_id, "bob")).await;
        next(&mut white.rx).await;
        next(&mut white.rx).await;
        next(&mut black.rx).await;

        state.connections.release(black.conn.id).await;
        assert_eq!(
            next(&mut white.rx).await,
            ServerMessage::OpponentDisconnected {
                game_id,
                grace_ms: 30_000
            }
        );

        let mut again = open(&state);
        handle_message(&state, &mut again.conn, join(game_id, "bob")).await;
        assert!(matches!(
            next(&mut again.rx).await,
            ServerMessage::GameStarted {
                your_color: PlayerSide::Black,
                ..
            }
        ));
        assert_eq!(
            next(&mut white.rx).await,
            ServerMessage::OpponentReconnected { game_id }
        );
    }
}
