//! Session state shared by every request: the current bearer token, the
//! refresh-in-progress flag, and the queue of requests suspended behind an
//! active refresh.
//!
//! The refresh lock is only ever held across check/mutate sequences, never
//! across an await point, which is what keeps the "exactly one refresh in
//! flight" invariant intact when requests fail concurrently.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::oneshot;

use crate::credentials::TokenStore;
use crate::error::RefreshError;

/// Callback invoked with the new token after a successful refresh cycle.
pub type RefreshListener = Box<dyn Fn(&str) + Send + Sync>;

/// Outcome delivered to every request queued behind a refresh cycle.
pub type RefreshOutcome = Result<String, RefreshError>;

/// Owns the mutable session state and the single-flight refresh protocol.
///
/// The current token mirrors the persisted [`TokenStore`] slot: it is
/// loaded once at construction and every in-process mutation writes through
/// to the store, so the two never diverge within a process lifetime.
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    current: RwLock<Option<String>>,
    refresh: Mutex<RefreshState>,
    listener: RwLock<Option<RefreshListener>>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Role assigned to a request that observed an unauthorized response.
pub enum RefreshTicket {
    /// No refresh was running: the caller must perform the refresh call and
    /// report its outcome through [`SessionManager::complete_refresh`].
    Leader,
    /// A refresh is already in flight: await the shared outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl SessionManager {
    /// Session seeded from the persisted token slot.
    ///
    /// A store that cannot be read starts the session unauthenticated; the
    /// failure is logged rather than propagated so a corrupt slot behaves
    /// like an absent one.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let current = store.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to read persisted session token");
            None
        });
        Self {
            store,
            current: RwLock::new(current),
            refresh: Mutex::new(RefreshState::default()),
            listener: RwLock::new(None),
        }
    }

    /// Token to attach as the bearer credential, if a session exists.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a session token is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Install `token` as the current credential and persist it.
    ///
    /// A persistence failure is logged and otherwise ignored: the in-memory
    /// credential still carries the session for this process.
    pub fn adopt_token(&self, token: &str) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        if let Err(err) = self.store.save(token) {
            tracing::warn!(error = %err, "failed to persist session token");
        }
    }

    /// Drop the current credential and delete the persisted copy.
    pub fn discard_token(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear persisted session token");
        }
    }

    /// Register the callback notified after each successful refresh.
    pub fn set_refresh_listener(&self, listener: RefreshListener) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Join or start a refresh cycle for a request rejected as unauthorized.
    ///
    /// The first caller while no refresh is running becomes the
    /// [`RefreshTicket::Leader`]; everyone else is queued as a
    /// [`RefreshTicket::Waiter`] and settles when the leader reports back.
    #[must_use]
    pub fn begin_refresh(&self) -> RefreshTicket {
        let mut state = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            RefreshTicket::Waiter(rx)
        } else {
            state.refreshing = true;
            RefreshTicket::Leader
        }
    }

    /// Publish the leader's refresh outcome.
    ///
    /// On success the new token is installed and persisted and the refresh
    /// listener is notified; on failure the session token is cleared
    /// entirely. Either way every queued waiter is settled exactly once, in
    /// arrival order, and only then is the in-progress flag reset so the
    /// next unauthorized response can start a fresh cycle.
    pub fn complete_refresh(&self, outcome: &RefreshOutcome) {
        match outcome {
            Ok(token) => {
                self.adopt_token(token);
                let listener = self
                    .listener
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(listener) = listener.as_ref() {
                    listener(token);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "session refresh failed; clearing token");
                self.discard_token();
            }
        }

        let mut state = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        for waiter in state.waiters.drain(..) {
            // A waiter whose request was dropped is allowed to miss the
            // outcome; everyone still listening gets it.
            let _ = waiter.send(outcome.clone());
        }
        state.refreshing = false;
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionManager")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
