//! Account endpoints: registration, login, profile, and sign-out.

use fleetline_api_models::{LoginPayload, RegisterPayload, TokenResponse, User};

use crate::error::ClientResult;
use crate::http::ApiClient;

const ME_PATH: &str = "/api/jwt-auth/me";
const REGISTER_PATH: &str = "/api/jwt-auth/register";
const LOGIN_PATH: &str = "/api/jwt-auth/login";

/// Typed wrapper for the authentication endpoints.
///
/// Register and login adopt the issued token into the shared session, so a
/// successful call leaves every clone of the underlying [`ApiClient`]
/// authenticated.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    /// Service over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create an account and start a session with the issued token.
    ///
    /// # Errors
    ///
    /// Propagates request failures; no token is adopted on failure.
    pub async fn register(&self, payload: &RegisterPayload) -> ClientResult<TokenResponse> {
        let response: TokenResponse = self.client.post_json(REGISTER_PATH, payload).await?;
        self.client.session().adopt_token(&response.token);
        Ok(response)
    }

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Propagates request failures; no token is adopted on failure.
    pub async fn login(&self, payload: &LoginPayload) -> ClientResult<TokenResponse> {
        let response: TokenResponse = self.client.post_json(LOGIN_PATH, payload).await?;
        self.client.session().adopt_token(&response.token);
        Ok(response)
    }

    /// Fetch the profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Propagates request failures, including the refresh failure raised
    /// when the session token has expired and cannot be renewed.
    pub async fn current_user(&self) -> ClientResult<User> {
        self.client.get_json(ME_PATH).await
    }

    /// End the session: the current token and its persisted copy are
    /// dropped. No backend call is involved.
    pub fn logout(&self) {
        self.client.session().discard_token();
    }
}
