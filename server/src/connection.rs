//! Connection registry: persistent connection → (user, bound session).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ids::{ConnectionId, GameId, UserId};
use crate::session::{JoinAck, SessionError, SessionHandle, SessionManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub user: UserId,
    pub game_id: GameId,
}

/// Single mutation entry point for connection bindings.
pub struct ConnectionRegistry {
    sessions: Arc<SessionManager>,
    bindings: Mutex<HashMap<ConnectionId, Binding>>,
}

impl ConnectionRegistry {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self) -> ConnectionId {
        let id = ConnectionId::new();
        tracing::debug!(connection = %id, "Connection opened");
        id
    }

    /// Verifies the user holds a seat, binds the connection, and lets the
    /// session decide between waiting, starting and reconnecting.
    pub async fn join_game(
        &self,
        connection: ConnectionId,
        game_id: GameId,
        user: UserId,
    ) -> Result<JoinAck, SessionError> {
        let handle = self
            .sessions
            .handle(game_id)
            .ok_or(SessionError::NotFound)?;
        if !handle.is_seated(&user) {
            return Err(SessionError::NotParticipant);
        }

        let binding = Binding {
            user: user.clone(),
            game_id,
        };
        let previous = self.bindings.lock().insert(connection, binding.clone());
        if let Some(previous) = previous.filter(|p| *p != binding) {
            self.detach(connection, previous).await;
        }

        let result = handle.connect(user, connection).await;
        let mut bindings = self.bindings.lock();
        if result.is_ok() {
            // The seat now belongs to this connection; older ones lose it.
            bindings.retain(|id, b| *id == connection || *b != binding);
        } else if bindings.get(&connection) == Some(&binding) {
            bindings.remove(&connection);
        }
        result
    }

    pub fn binding(&self, connection: ConnectionId) -> Option<Binding> {
        self.bindings.lock().get(&connection).cloned()
    }

    /// The session this connection may act on, as the user it joined as.
    pub fn bound_session(
        &self,
        connection: ConnectionId,
        game_id: GameId,
    ) -> Result<(UserId, SessionHandle), SessionError> {
        let binding = self
            .binding(connection)
            .filter(|b| b.game_id == game_id)
            .ok_or(SessionError::NotJoined)?;
        let handle = self
            .sessions
            .handle(game_id)
            .ok_or(SessionError::NotFound)?;
        Ok((binding.user, handle))
    }

    /// Transport-level loss: disconnect the bound seat, if any.
    pub async fn release(&self, connection: ConnectionId) {
        let binding = self.bindings.lock().remove(&connection);
        if let Some(binding) = binding {
            self.detach(connection, binding).await;
        }
        tracing::debug!(connection = %connection, "Connection closed");
    }

    async fn detach(&self, connection: ConnectionId, binding: Binding) {
        if let Some(handle) = self.sessions.handle(binding.game_id) {
            handle.disconnect(binding.user, connection).await;
        }
    }

    pub fn connection_count(&self) -> usize {
        self.bindings.lock().len()
    }
}
