//! Session layer: owns running games by session id and connects them to the
//! messaging and identity collaborators.

pub mod actor;
pub mod messenger;
pub mod render;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::game::GameConfig;
use crate::types::PlayerId;

pub use actor::{DELIVERY_TIMEOUT, Operation, SessionHandle, Snapshot, spawn_session};
pub use messenger::{
    IdentityResolver, MemoryMessenger, Messenger, MessengerError, Outgoing, PassthroughIdentity,
};

/// Group or chat the game is played in.
pub type SessionId = String;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a game is already running in {0}")]
    AlreadyOpen(SessionId),
    #[error("no game is running in {0}")]
    NotFound(SessionId),
}

/// Maps session ids to running games. Sessions never share state.
pub struct SessionManager {
    config: GameConfig,
    messenger: Arc<dyn Messenger>,
    identity: Arc<dyn IdentityResolver>,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        config: GameConfig,
        messenger: Arc<dyn Messenger>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            config,
            messenger,
            identity,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, raw_address: &str) -> PlayerId {
        self.identity.resolve_stable_id(raw_address)
    }

    /// Opens a lobby in `session` hosted by whoever `host_address` resolves to.
    pub async fn open(
        &self,
        session: &str,
        host_address: &str,
        host_name: &str,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, handle| !handle.is_closed());
        if sessions.contains_key(session) {
            return Err(SessionError::AlreadyOpen(session.to_string()));
        }
        let host = self.resolve(host_address);
        let handle = spawn_session(
            session.to_string(),
            self.config.clone(),
            host,
            host_name.to_string(),
            Arc::clone(&self.messenger),
        );
        sessions.insert(session.to_string(), handle.clone());
        info!(%session, open = sessions.len(), "session registered");
        Ok(handle)
    }

    pub async fn get(&self, session: &str) -> Result<SessionHandle, SessionError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session)
            .filter(|handle| !handle.is_closed())
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session.to_string()))
    }

    /// Forgets a session. Its task stops once no handle remains.
    pub async fn close(&self, session: &str) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .await
            .remove(session)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(session.to_string()))
    }

    pub async fn active(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, handle| !handle.is_closed());
        sessions.len()
    }
}
