//! Shared context, error types, and telemetry wiring for the CLI.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use fleetline_client::{
    ApiClient, AuthService, ClientConfig, ClientError, DeviceService, FileTokenStore, TokenStore,
    UserStore,
};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::cli::Cli;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) api: ApiClient,
    pub(crate) auth: AuthService,
    pub(crate) devices: DeviceService,
    pub(crate) store: Arc<UserStore>,
}

impl AppContext {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self {
            auth: AuthService::new(api.clone()),
            devices: DeviceService::new(api.clone()),
            store: UserStore::subscribe(api.clone()),
            api,
        }
    }
}

/// Construct the application context from CLI options.
pub(crate) fn build_context(cli: &Cli) -> CliResult<AppContext> {
    let token_path = cli.token_file.clone().unwrap_or_else(default_token_path);
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(token_path));
    let config = ClientConfig::new(cli.api_url.clone())
        .with_timeout(Duration::from_secs(cli.timeout));
    let api = ApiClient::new(&config, store)
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
    Ok(AppContext::new(api))
}

/// Map a client-library failure onto the CLI error taxonomy: statuses the
/// operator can correct become validation errors, everything else is an
/// operational failure.
pub(crate) fn classify_client_error(err: ClientError) -> CliError {
    match err {
        ClientError::Api { status, message }
            if matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
            ) =>
        {
            CliError::validation(message)
        }
        other => CliError::failure(other),
    }
}

fn default_token_path() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || PathBuf::from(".fleetline-token"),
        |home| {
            let mut path = PathBuf::from(home);
            path.push(".config");
            path.push("fleetline");
            path.push("token");
            path
        },
    )
}

/// Telemetry emitter used to forward CLI outcomes.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    client: Client,
    endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = env::var("FLEETLINE_TELEMETRY_ENDPOINT").ok()?;
        let endpoint = endpoint.parse().ok()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub(crate) async fn emit(
        &self,
        trace_id: &str,
        command: &str,
        outcome: &str,
        exit_code: i32,
        message: Option<&str>,
    ) {
        let event = TelemetryEvent {
            command,
            outcome,
            trace_id,
            exit_code,
            message,
            timestamp_ms: timestamp_now_ms(),
        };

        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(&event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    command: &'a str,
    outcome: &'a str,
    trace_id: &'a str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    timestamp_ms: u64,
}

fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetline_client::RefreshError;
    use httpmock::MockServer;
    use httpmock::prelude::*;

    #[test]
    fn classify_maps_correctable_statuses_to_validation() {
        let err = classify_client_error(ClientError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "device name is required".to_string(),
        });
        assert!(matches!(err, CliError::Validation(message) if message.contains("required")));
        assert_eq!(
            classify_client_error(ClientError::Api {
                status: StatusCode::CONFLICT,
                message: "taken".to_string(),
            })
            .exit_code(),
            2
        );
    }

    #[test]
    fn classify_maps_other_failures_to_operational() {
        let err = classify_client_error(ClientError::Refresh(RefreshError::rejected(
            401,
            "refresh rejected with status 401",
        )));
        assert!(matches!(err, CliError::Failure(_)));
        assert_eq!(
            classify_client_error(ClientError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "boom".to_string(),
            })
            .exit_code(),
            3
        );
    }

    #[tokio::test]
    async fn telemetry_emitter_emits_event() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/telemetry");
            then.status(200);
        });

        let emitter = TelemetryEmitter {
            client: Client::new(),
            endpoint: format!("{}/telemetry", server.base_url())
                .parse()
                .expect("valid URL"),
        };

        emitter
            .emit("trace", "command", "success", 0, Some("message"))
            .await;

        mock.assert();
    }
}
