//! Authenticated HTTP client with transparent token refresh.
//!
//! The request path attaches the current bearer token when one exists. The
//! response path recovers from a 401 by refreshing the session exactly once
//! across all concurrent failures: the first 401 leads the refresh, later
//! 401s queue behind it, and every affected request is resent a single time
//! with the new token. A request that fails again after its resend is
//! propagated as-is.

use std::sync::Arc;

use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use fleetline_api_models::{ApiErrorBody, TokenResponse};

use crate::config::ClientConfig;
use crate::credentials::TokenStore;
use crate::error::{ClientError, ClientResult, RefreshError};
use crate::session::{RefreshTicket, SessionManager};

/// Path of the token-refresh endpoint.
const REFRESH_PATH: &str = "/api/jwt-auth/refresh";

/// HTTP client bound to a Fleetline backend.
///
/// Cheap to clone; clones share the session state, so a refresh performed
/// through one clone is visible to all of them.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<SessionManager>,
}

impl ApiClient {
    /// Client for the given endpoint, with the session seeded from `store`.
    ///
    /// The underlying client carries a cookie jar: the refresh endpoint is
    /// cookie-credentialled in addition to the bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session: Arc::new(SessionManager::new(store)),
        })
    }

    /// Session state shared with service wrappers and stores.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// GET `path` and decode a JSON response body.
    ///
    /// # Errors
    ///
    /// Propagates transport failures, non-success statuses, and refresh
    /// failures per the taxonomy on [`ClientError`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request_json(Method::GET, path, None).await
    }

    /// POST `body` as JSON to `path` and decode a JSON response body.
    ///
    /// # Errors
    ///
    /// Propagates transport failures, non-success statuses, and refresh
    /// failures per the taxonomy on [`ClientError`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(serde_json::to_value(body)?))
            .await
    }

    /// PUT `body` as JSON to `path` and decode a JSON response body.
    ///
    /// # Errors
    ///
    /// Propagates transport failures, non-success statuses, and refresh
    /// failures per the taxonomy on [`ClientError`].
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::PUT, path, Some(serde_json::to_value(body)?))
            .await
    }

    /// DELETE `path`, discarding any response body.
    ///
    /// # Errors
    ///
    /// Propagates transport failures, non-success statuses, and refresh
    /// failures per the taxonomy on [`ClientError`].
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let response = self.execute(Method::DELETE, path, None).await?;
        Self::into_success(response).await?;
        Ok(())
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<T> {
        let response = self.execute(method, path, body.as_ref()).await?;
        let response = Self::into_success(response).await?;
        Ok(response.json().await?)
    }

    /// Core request path: send once, and on a 401 refresh the session and
    /// resend exactly once. The resend's outcome is terminal; a second 401
    /// propagates without another refresh attempt.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ClientResult<Response> {
        let url = self.base_url.join(path)?;
        let first = self
            .dispatch(method.clone(), url.clone(), body, self.session.bearer_token())
            .await?;
        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        let token = match self.session.begin_refresh() {
            RefreshTicket::Leader => self.lead_refresh().await?,
            RefreshTicket::Waiter(outcome) => outcome
                .await
                .unwrap_or_else(|_| {
                    Err(RefreshError::transport("refresh cycle was abandoned"))
                })
                .map_err(ClientError::Refresh)?,
        };
        self.dispatch(method, url, body, Some(token)).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        token: Option<String>,
    ) -> ClientResult<Response> {
        let mut request = self.http.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Leader half of a refresh cycle: one network call, then publish the
    /// outcome through the session, which settles every queued waiter and
    /// resets the in-progress flag.
    async fn lead_refresh(&self) -> ClientResult<String> {
        tracing::debug!("refreshing session token");
        let outcome = self.request_fresh_token().await;
        self.session.complete_refresh(&outcome);
        outcome.map_err(ClientError::Refresh)
    }

    async fn request_fresh_token(&self) -> Result<String, RefreshError> {
        let url = self
            .base_url
            .join(REFRESH_PATH)
            .map_err(|err| RefreshError::transport(format!("invalid refresh URL: {err}")))?;

        let mut request = self.http.post(url);
        if let Some(token) = self.session.bearer_token() {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|err| RefreshError::transport(format!("refresh request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::rejected(
                status.as_u16(),
                format!("refresh rejected with status {status}"),
            ));
        }
        let body: TokenResponse = response.json().await.map_err(|err| {
            RefreshError::rejected(
                status.as_u16(),
                format!("malformed refresh response: {err}"),
            )
        })?;
        Ok(body.token)
    }

    /// Classify a terminal response: success passes through, anything else
    /// becomes a [`ClientError::Api`] with a best-effort message from the
    /// body.
    async fn into_success(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = read_error_message(response).await;
        Err(ClientError::Api { status, message })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

async fn read_error_message(response: Response) -> String {
    let bytes = response.bytes().await.unwrap_or_default();
    let body_text = String::from_utf8_lossy(&bytes);
    serde_json::from_slice::<ApiErrorBody>(&bytes)
        .ok()
        .and_then(|body| body.detail().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body_text.trim();
            if trimmed.is_empty() {
                "no details provided".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryTokenStore;
    use fleetline_api_models::Device;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    const DEVICES_PATH: &str = "/api/devices";

    fn client_for(
        server: &MockServer,
        token: Option<&str>,
    ) -> (ApiClient, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::default());
        if let Some(token) = token {
            store.save(token).expect("seed token");
        }
        let config = ClientConfig::new(server.base_url().parse().expect("valid URL"));
        let client = ApiClient::new(&config, Arc::clone(&store) as Arc<dyn TokenStore>)
            .expect("client builds");
        (client, store)
    }

    fn device_json(name: &str) -> Value {
        json!({
            "deviceGuid": uuid::Uuid::new_v4(),
            "name": name,
            "isAlive": true,
            "methods": []
        })
    }

    #[tokio::test]
    async fn attaches_bearer_header_when_token_stored() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([]));
        });

        let (client, _store) = client_for(&server, Some("t1"));
        let devices: Vec<Device> = client.get_json(DEVICES_PATH).await.expect("list succeeds");
        assert!(devices.is_empty());
        mock.assert();
    }

    #[tokio::test]
    async fn omits_bearer_header_without_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header_missing("authorization");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([]));
        });

        let (client, _store) = client_for(&server, None);
        let devices: Vec<Device> = client.get_json(DEVICES_PATH).await.expect("list succeeds");
        assert!(devices.is_empty());
        mock.assert();
    }

    #[tokio::test]
    async fn refresh_success_replays_request_with_new_token() {
        let server = MockServer::start_async().await;
        let expired = server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t1");
            then.status(401);
        });
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/api/jwt-auth/refresh")
                .header("authorization", "Bearer t1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "t2"}));
        });
        let replayed = server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([device_json("relay")]));
        });

        let (client, store) = client_for(&server, Some("t1"));
        let devices: Vec<Device> = client.get_json(DEVICES_PATH).await.expect("list succeeds");

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "relay");
        expired.assert();
        refresh.assert();
        replayed.assert();
        assert_eq!(store.load().expect("load"), Some("t2".to_string()));
    }

    #[tokio::test]
    async fn concurrent_failures_share_a_single_refresh() {
        let server = MockServer::start_async().await;
        let expired = server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t1");
            then.status(401);
        });
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/api/jwt-auth/refresh");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "t2"}))
                .delay(std::time::Duration::from_millis(150));
        });
        let replayed = server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([]));
        });

        let (client, _store) = client_for(&server, Some("t1"));
        let (first, second, third) = tokio::join!(
            client.get_json::<Vec<Device>>(DEVICES_PATH),
            client.get_json::<Vec<Device>>(DEVICES_PATH),
            client.get_json::<Vec<Device>>(DEVICES_PATH),
        );

        first.expect("first call settles");
        second.expect("second call settles");
        third.expect("third call settles");
        refresh.assert_calls(1);
        assert!(expired.calls() >= 1);
        assert!(replayed.calls() >= 1);
    }

    #[tokio::test]
    async fn second_unauthorized_propagates_without_second_refresh() {
        let server = MockServer::start_async().await;
        let always_expired = server.mock(|when, then| {
            when.method(GET).path(DEVICES_PATH);
            then.status(401);
        });
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/api/jwt-auth/refresh");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "t2"}));
        });

        let (client, _store) = client_for(&server, Some("t1"));
        let err = client
            .get_json::<Vec<Device>>(DEVICES_PATH)
            .await
            .expect_err("second 401 is terminal");

        assert!(
            matches!(err, ClientError::Api { status, .. } if status == StatusCode::UNAUTHORIZED)
        );
        always_expired.assert_calls(2);
        refresh.assert_calls(1);
    }

    #[tokio::test]
    async fn refresh_failure_rejects_all_waiters_and_clears_token() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(DEVICES_PATH);
            then.status(401);
        });
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/api/jwt-auth/refresh");
            then.status(500)
                .delay(std::time::Duration::from_millis(150));
        });

        let (client, store) = client_for(&server, Some("t1"));
        let (first, second) = tokio::join!(
            client.get_json::<Vec<Device>>(DEVICES_PATH),
            client.get_json::<Vec<Device>>(DEVICES_PATH),
        );

        for outcome in [first, second] {
            let err = outcome.expect_err("refresh failure propagates");
            assert!(
                matches!(err, ClientError::Refresh(ref failure) if failure.status == Some(500))
            );
        }
        refresh.assert_calls(1);
        assert_eq!(store.load().expect("load"), None);
    }

    #[tokio::test]
    async fn failed_cycle_does_not_block_the_next_one() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t1");
            then.status(401);
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/jwt-auth/refresh")
                .header("authorization", "Bearer t1");
            then.status(502);
        });

        let (client, _store) = client_for(&server, Some("t1"));
        let err = client
            .get_json::<Vec<Device>>(DEVICES_PATH)
            .await
            .expect_err("first cycle fails");
        assert!(matches!(err, ClientError::Refresh(_)));

        // A later sign-in issues a new token; the next 401 must start a new
        // cycle rather than find the flag stuck.
        client.session().adopt_token("t3");
        server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t3");
            then.status(401);
        });
        let second_refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/api/jwt-auth/refresh")
                .header("authorization", "Bearer t3");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "t4"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path(DEVICES_PATH)
                .header("authorization", "Bearer t4");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([]));
        });

        let devices: Vec<Device> = client
            .get_json(DEVICES_PATH)
            .await
            .expect("second cycle succeeds");
        assert!(devices.is_empty());
        second_refresh.assert();
    }

    #[tokio::test]
    async fn non_unauthorized_failures_propagate_without_refresh() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(DEVICES_PATH);
            then.status(503)
                .header("content-type", "application/json")
                .json_body(json!({"message": "maintenance window"}));
        });
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/api/jwt-auth/refresh");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "t2"}));
        });

        let (client, _store) = client_for(&server, Some("t1"));
        let err = client
            .get_json::<Vec<Device>>(DEVICES_PATH)
            .await
            .expect_err("503 propagates");

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(message, "maintenance window");
            }
            other => panic!("unexpected error {other:?}"),
        }
        refresh.assert_calls(0);
    }

    #[tokio::test]
    async fn malformed_refresh_body_is_a_refresh_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(DEVICES_PATH);
            then.status(401);
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/jwt-auth/refresh");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"unexpected": true}));
        });

        let (client, store) = client_for(&server, Some("t1"));
        let err = client
            .get_json::<Vec<Device>>(DEVICES_PATH)
            .await
            .expect_err("malformed body fails the cycle");

        assert!(
            matches!(err, ClientError::Refresh(ref failure) if failure.message.contains("malformed"))
        );
        assert_eq!(store.load().expect("load"), None);
    }
}
