use tokio::sync::{mpsc, oneshot};

use super::commands::*;
use super::snapshot::GameSnapshot;
use crate::ids::{ConnectionId, GameId, UserId};

/// Cheap, cloneable handle to a session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: GameId,
    white: UserId,
    black: UserId,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: GameId,
        white: UserId,
        black: UserId,
        cmd_tx: mpsc::Sender<SessionCommand>,
    ) -> Self {
        Self {
            id,
            white,
            black,
            cmd_tx,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    /// Seats never change, so this is answered without asking the actor.
    pub fn is_seated(&self, user: &UserId) -> bool {
        &self.white == user || &self.black == user
    }

    pub async fn connect(
        &self,
        user: UserId,
        connection: ConnectionId,
    ) -> Result<JoinAck, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Connect {
            user,
            connection,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    pub async fn disconnect(&self, user: UserId, connection: ConnectionId) {
        let _ = self
            .cmd_tx
            .send(SessionCommand::Disconnect { user, connection })
            .await;
    }

    pub async fn make_move(
        &self,
        user: UserId,
        request: MoveRequest,
    ) -> Result<MoveAck, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::MakeMove {
            user,
            request,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    pub async fn resign(&self, user: UserId) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Resign { user, reply: tx }).await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    pub async fn offer_draw(&self, user: UserId) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::OfferDraw { user, reply: tx })
            .await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    pub async fn accept_draw(&self, user: UserId) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::AcceptDraw { user, reply: tx })
            .await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    pub async fn decline_draw(&self, user: UserId) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::DeclineDraw { user, reply: tx })
            .await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await.map_err(|_| reply_dropped())
    }

    /// Non-blocking nudge from the sweep. A full inbox skips this tick.
    /// Returns false once the actor has exited.
    pub fn tick(&self) -> bool {
        match self.cmd_tx.try_send(SessionCommand::Tick) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("Session actor closed".into()))
    }
}

fn reply_dropped() -> SessionError {
    SessionError::Internal("Reply dropped".into())
}
