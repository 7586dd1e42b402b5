//! Session state container.
//!
//! Holds the signed-in [`Identity`] for the life of the client. The store is
//! an explicit handle that is cloned into whatever needs it (the ceremony
//! orchestrator writes to it, poll views read from it) rather than ambient
//! global state. Observers subscribe through a `tokio::sync::watch` channel.

use std::sync::Arc;

use passvote_types::Identity;
use tokio::sync::watch;
use tracing::{debug, info};

/// Lifecycle of the container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// The initial identity lookup has not finished yet.
    #[default]
    Uninitialized,
    /// Lookup finished; `None` means nobody is signed in.
    Resolved(Option<Identity>),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Resolved(identity) => identity.as_ref(),
            Self::Uninitialized => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }
}

/// Cheaply cloneable handle to the shared session state.
#[derive(Clone, Debug)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Uninitialized);
        Self { tx: Arc::new(tx) }
    }

    /// A store that is already resolved, e.g. for a client that was handed a
    /// known identity.
    pub fn resolved(identity: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Resolved(identity));
        Self { tx: Arc::new(tx) }
    }

    /// Record the result of the initial identity lookup.
    ///
    /// Only the first call has any effect; returns whether it was applied.
    pub fn initialize(&self, identity: Option<Identity>) -> bool {
        let applied = self.tx.send_if_modified(|state| {
            if state.is_loading() {
                *state = SessionState::Resolved(identity.clone());
                true
            } else {
                false
            }
        });
        if applied {
            debug!(signed_in = identity.is_some(), "session initialized");
        } else {
            debug!("session already initialized, ignoring repeated initialize");
        }
        applied
    }

    pub fn identity(&self) -> Option<Identity> {
        self.tx.borrow().identity().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading()
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Replace the identity. Resolves an uninitialized store.
    pub fn set_identity(&self, identity: Option<Identity>) {
        match &identity {
            Some(identity) => info!(user_id = %identity.id, "session identity set"),
            None => debug!("session identity cleared"),
        }
        self.tx.send_replace(SessionState::Resolved(identity));
    }

    /// Sign out locally. No network I/O.
    pub fn clear(&self) {
        self.set_identity(None);
    }

    /// Observe every change to the session state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("u-1", "alice")
    }

    #[test]
    fn starts_loading() {
        let store = SessionStore::new();
        assert!(store.is_loading());
        assert_eq!(store.identity(), None);
    }

    #[test]
    fn first_initialize_wins() {
        let store = SessionStore::new();
        assert!(store.initialize(Some(alice())));
        assert!(!store.initialize(None));
        assert!(!store.is_loading());
        assert_eq!(store.identity(), Some(alice()));
    }

    #[test]
    fn set_identity_resolves_uninitialized_store() {
        let store = SessionStore::new();
        store.set_identity(Some(alice()));
        assert!(!store.is_loading());
        assert_eq!(store.identity(), Some(alice()));
        // initialize after an explicit set is ignored
        assert!(!store.initialize(None));
        assert_eq!(store.identity(), Some(alice()));
    }

    #[test]
    fn clear_signs_out() {
        let store = SessionStore::resolved(Some(alice()));
        store.clear();
        assert_eq!(store.state(), SessionState::Resolved(None));
    }

    #[test]
    fn clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();
        other.set_identity(Some(alice()));
        assert_eq!(store.identity(), Some(alice()));
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_loading());

        store.set_identity(Some(alice()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().identity(), Some(&alice()));

        store.clear();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Resolved(None));
    }
}
