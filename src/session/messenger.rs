//! Boundary traits for the chat transport and identity linking.

use tokio::sync::Mutex;

use crate::types::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("delivery to {to} failed: {reason}")]
    Delivery { to: String, reason: String },
    #[error("transport closed")]
    Closed,
}

/// Outbound messages. Calls are fire-and-forget from the engine's side:
/// failures are logged by the caller and never retried.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn notify(&self, player: &PlayerId, message: &str) -> Result<(), MessengerError>;
    async fn announce(&self, group: &str, message: &str) -> Result<(), MessengerError>;
}

/// Maps a raw transport address to the opaque id the engine uses.
pub trait IdentityResolver: Send + Sync {
    fn resolve_stable_id(&self, raw_address: &str) -> PlayerId;
}

/// Uses the raw address as the id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughIdentity;

impl IdentityResolver for PassthroughIdentity {
    fn resolve_stable_id(&self, raw_address: &str) -> PlayerId {
        PlayerId::new(raw_address.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Private { to: PlayerId, text: String },
    Public { group: String, text: String },
}

/// Keeps every message in memory. Used by tests and the local simulator.
#[derive(Debug, Default)]
pub struct MemoryMessenger {
    sent: Mutex<Vec<Outgoing>>,
}

impl MemoryMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Outgoing> {
        self.sent.lock().await.clone()
    }

    pub async fn private_to(&self, player: &PlayerId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|out| match out {
                Outgoing::Private { to, text } if to == player => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn announcements(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|out| match out {
                Outgoing::Public { text, .. } => Some(text.clone()),
                Outgoing::Private { .. } => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Messenger for MemoryMessenger {
    async fn notify(&self, player: &PlayerId, message: &str) -> Result<(), MessengerError> {
        self.sent.lock().await.push(Outgoing::Private {
            to: player.clone(),
            text: message.to_string(),
        });
        Ok(())
    }

    async fn announce(&self, group: &str, message: &str) -> Result<(), MessengerError> {
        self.sent.lock().await.push(Outgoing::Public {
            group: group.to_string(),
            text: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_trims_the_address() {
        assert_eq!(
            PassthroughIdentity.resolve_stable_id("  alice "),
            PlayerId::new("alice")
        );
    }

    #[tokio::test]
    async fn memory_messenger_splits_private_and_public() {
        let messenger = MemoryMessenger::new();
        let alice = PlayerId::new("alice");
        messenger.notify(&alice, "psst").await.expect("in memory");
        messenger.announce("g", "hello all").await.expect("in memory");
        assert_eq!(messenger.private_to(&alice).await, vec!["psst".to_string()]);
        assert_eq!(messenger.announcements().await, vec!["hello all".to_string()]);
    }
}
