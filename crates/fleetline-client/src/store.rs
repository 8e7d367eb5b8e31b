//! Cached profile of the signed-in user.
//!
//! The store mirrors the backend's notion of "who is signed in": a fetch
//! commits the profile on success and clears it on failure, so a stale
//! profile never outlives a broken session. Subscribing the store to the
//! session makes a successful token refresh trigger a background refetch
//! whose failure is swallowed so it cannot affect the request that
//! triggered the refresh.

use std::sync::{Arc, PoisonError, RwLock};

use fleetline_api_models::User;

use crate::auth::AuthService;
use crate::error::ClientResult;
use crate::http::ApiClient;

/// Process-wide cache of the signed-in user's profile.
#[derive(Debug)]
pub struct UserStore {
    auth: AuthService,
    user: RwLock<Option<User>>,
}

impl UserStore {
    /// Store bound to the given client, subscribed to its session so each
    /// successful token refresh schedules a profile refetch.
    ///
    /// The refetch runs as a spawned task, so refreshes must happen inside a
    /// `tokio` runtime (they do: the refresh itself is an async operation).
    /// The subscription holds only a weak handle; dropping the store simply
    /// ends the refetches.
    #[must_use]
    pub fn subscribe(client: ApiClient) -> Arc<Self> {
        let session = Arc::clone(client.session());
        let store = Arc::new(Self {
            auth: AuthService::new(client),
            user: RwLock::new(None),
        });
        let subscriber = Arc::downgrade(&store);
        session.set_refresh_listener(Box::new(move |_token| {
            let Some(store) = subscriber.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                if let Err(err) = store.fetch_user().await {
                    tracing::debug!(error = %err, "post-refresh profile fetch failed");
                }
            });
        }));
        store
    }

    /// Fetch the signed-in user's profile and cache it.
    ///
    /// # Errors
    ///
    /// Propagates the fetch failure after clearing the cached profile.
    pub async fn fetch_user(&self) -> ClientResult<User> {
        match self.auth.current_user().await {
            Ok(user) => {
                *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
                Err(err)
            }
        }
    }

    /// Drop the cached profile without touching the session.
    pub fn clear_user(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Snapshot of the cached profile.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
